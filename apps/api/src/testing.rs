//! Test support: a fake Mistral API served by axum on an ephemeral port.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::{
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode, Uri},
    response::{IntoResponse, Response},
    Router,
};
use serde_json::{json, Value};
use tokio::task::JoinHandle;

use crate::config::ProviderConfig;

#[derive(Debug, Clone)]
pub struct Canned {
    pub status: StatusCode,
    pub body: String,
    pub delay: Option<Duration>,
}

impl Canned {
    /// A 200 chat-completion envelope whose first choice holds `content`.
    pub fn chat_reply(content: &str) -> Self {
        let body = json!({
            "id": "cmpl-test",
            "object": "chat.completion",
            "choices": [{"index": 0, "message": {"role": "assistant", "content": content}}]
        });
        Self::status(StatusCode::OK, &body.to_string())
    }

    /// A 200 OCR response with one page per entry.
    pub fn ocr_pages(pages: &[&str]) -> Self {
        let pages: Vec<Value> = pages
            .iter()
            .enumerate()
            .map(|(i, md)| json!({"index": i, "markdown": md}))
            .collect();
        Self::status(StatusCode::OK, &json!({ "pages": pages }).to_string())
    }

    pub fn status(status: StatusCode, body: &str) -> Self {
        Self {
            status,
            body: body.to_string(),
            delay: None,
        }
    }

    pub fn delayed(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }
}

#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub path: String,
    pub authorization: Option<String>,
    pub body: Value,
}

#[derive(Clone)]
struct FakeState {
    routes: Arc<HashMap<&'static str, Canned>>,
    requests: Arc<Mutex<Vec<RecordedRequest>>>,
}

pub struct FakeApi {
    pub addr: SocketAddr,
    requests: Arc<Mutex<Vec<RecordedRequest>>>,
    handle: JoinHandle<()>,
}

impl FakeApi {
    /// Serves `chat` at `/v1/chat/completions` and `ocr` at `/v1/ocr`.
    pub async fn spawn(chat: Canned, ocr: Canned) -> Self {
        let requests = Arc::new(Mutex::new(Vec::new()));
        let state = FakeState {
            routes: Arc::new(HashMap::from([
                ("/v1/chat/completions", chat),
                ("/v1/ocr", ocr),
            ])),
            requests: Arc::clone(&requests),
        };

        let app = Router::new().fallback(serve_canned).with_state(state);
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let handle = tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            addr,
            requests,
            handle,
        }
    }

    pub async fn chat_only(chat: Canned) -> Self {
        Self::spawn(chat, Canned::status(StatusCode::NOT_FOUND, "{}")).await
    }

    pub fn base_url(&self) -> String {
        format!("http://{}/v1", self.addr)
    }

    /// Provider config pointed at this server with a fake credential.
    pub fn provider_config(&self) -> ProviderConfig {
        self.provider_config_with(&[])
    }

    pub fn provider_config_with(&self, extra: &[(&str, &str)]) -> ProviderConfig {
        let mut vars: HashMap<String, String> = HashMap::from([
            ("MISTRAL_API_KEY".to_string(), "test-key".to_string()),
            ("MISTRAL_API_BASE".to_string(), self.base_url()),
        ]);
        for (k, v) in extra {
            vars.insert(k.to_string(), v.to_string());
        }
        ProviderConfig::from_lookup(|key| vars.get(key).cloned()).unwrap()
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.lock().unwrap().clone()
    }
}

impl Drop for FakeApi {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

async fn serve_canned(
    State(state): State<FakeState>,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let path = uri.path().to_string();
    state.requests.lock().unwrap().push(RecordedRequest {
        path: path.clone(),
        authorization: headers
            .get("authorization")
            .and_then(|v| v.to_str().ok())
            .map(String::from),
        body: serde_json::from_slice(&body).unwrap_or(Value::Null),
    });

    match state.routes.get(path.as_str()) {
        Some(canned) => {
            if let Some(delay) = canned.delay {
                tokio::time::sleep(delay).await;
            }
            (
                canned.status,
                [("content-type", "application/json")],
                canned.body.clone(),
            )
                .into_response()
        }
        None => StatusCode::NOT_FOUND.into_response(),
    }
}

/// A schema-valid reply covering the default metrics.
pub const VALID_REPLY: &str = r#"{
    "overall_score": 78,
    "metrics": {"skills_match": 85, "relevant_experience": 80, "education": 60, "soft_skills": 70},
    "candidate_summary": "Backend engineer with four years of Python and Django.",
    "analysis": "Strong match on Python and PostgreSQL; experience exceeds the 3+ year requirement."
}"#;
