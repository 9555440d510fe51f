/// LLM Client: the single point of entry for all Mistral API calls.
///
/// ARCHITECTURAL RULE: No other module may call the remote API directly.
/// Chat completions and OCR both go through `MistralClient::post_json`, which
/// owns authentication, the request timeout and failure classification.
///
/// No automatic retries: one call, one classified outcome.
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

use crate::config::ProviderConfig;

pub mod prompts;

#[derive(Debug, Error)]
pub enum LlmError {
    #[error("Mistral API quota exceeded. Please check your plan and billing details.")]
    RateLimited,

    #[error("Mistral API is currently overloaded. Please try again in a few minutes.")]
    ServiceOverloaded,

    #[error("Request timed out. The API is taking too long to respond. Please try again.")]
    RequestTimedOut,

    #[error("Mistral API key is invalid or missing. Please check your API key configuration.")]
    Unauthorized,

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Unexpected response shape: {0}")]
    UnexpectedResponseShape(String),
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
    max_tokens: u32,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChatChoiceMessage {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    message: Option<String>,
    error: Option<serde_json::Value>,
}

/// Thin client over the Mistral HTTP API. One instance per invocation.
pub struct MistralClient {
    client: Client,
    api_base: String,
    api_key: String,
}

impl MistralClient {
    pub fn new(config: &ProviderConfig) -> Result<Self, LlmError> {
        let client = Client::builder().timeout(config.request_timeout).build()?;
        Ok(Self {
            client,
            api_base: config.api_base.clone(),
            api_key: config.api_key().to_string(),
        })
    }

    /// POSTs `body` to `{api_base}/{path}` and returns the raw response body of
    /// a 2xx reply. Any other outcome is classified into an `LlmError`.
    pub async fn post_json<B: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<String, LlmError> {
        let url = format!("{}/{}", self.api_base, path.trim_start_matches('/'));

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .header("content-type", "application/json")
            .json(body)
            .send()
            .await
            .map_err(classify_transport_error)?;

        let status = response.status();
        let text = response.text().await.map_err(classify_transport_error)?;

        if !status.is_success() {
            let message = extract_error_message(&text);
            warn!(%url, status = status.as_u16(), "Mistral API returned an error: {message}");
            return Err(classify_status(status, message));
        }

        debug!(%url, bytes = text.len(), "Mistral API call succeeded");
        Ok(text)
    }

    /// Sends a single-user-message chat completion and returns the text of the
    /// first choice.
    pub async fn complete(&self, prompt: &str, config: &ProviderConfig) -> Result<String, LlmError> {
        let request = ChatRequest {
            model: &config.model_name,
            messages: vec![ChatMessage {
                role: "user",
                content: prompt,
            }],
            temperature: config.temperature,
            max_tokens: config.max_tokens,
        };

        let body = self.post_json("chat/completions", &request).await?;
        first_choice_content(&body)
    }
}

/// Pulls `choices[0].message.content` out of a chat completion envelope.
fn first_choice_content(body: &str) -> Result<String, LlmError> {
    let parsed: ChatResponse = serde_json::from_str(body)
        .map_err(|e| LlmError::UnexpectedResponseShape(format!("invalid envelope: {e}")))?;

    parsed
        .choices
        .into_iter()
        .next()
        .and_then(|c| c.message.content)
        .ok_or_else(|| LlmError::UnexpectedResponseShape("no choices[0].message.content".into()))
}

fn extract_error_message(body: &str) -> String {
    match serde_json::from_str::<ApiErrorBody>(body) {
        Ok(ApiErrorBody {
            message: Some(m), ..
        }) => m,
        Ok(ApiErrorBody {
            error: Some(serde_json::Value::String(m)),
            ..
        }) => m,
        Ok(ApiErrorBody {
            error: Some(serde_json::Value::Object(obj)),
            ..
        }) => obj
            .get("message")
            .and_then(|m| m.as_str())
            .map(String::from)
            .unwrap_or_else(|| body.to_string()),
        _ => body.to_string(),
    }
}

fn classify_status(status: StatusCode, message: String) -> LlmError {
    match status.as_u16() {
        429 => LlmError::RateLimited,
        503 => LlmError::ServiceOverloaded,
        408 | 504 => LlmError::RequestTimedOut,
        401 => LlmError::Unauthorized,
        code => classify_message(&message).unwrap_or(LlmError::Api {
            status: code,
            message,
        }),
    }
}

fn classify_transport_error(e: reqwest::Error) -> LlmError {
    if e.is_timeout() {
        return LlmError::RequestTimedOut;
    }
    classify_message(&e.to_string()).unwrap_or(LlmError::Http(e))
}

/// Maps well-known failure substrings onto the classified variants.
fn classify_message(message: &str) -> Option<LlmError> {
    let lower = message.to_lowercase();
    if lower.contains("429") || lower.contains("quota") || lower.contains("rate limit") {
        Some(LlmError::RateLimited)
    } else if lower.contains("503") || lower.contains("overloaded") {
        Some(LlmError::ServiceOverloaded)
    } else if lower.contains("timeout") || lower.contains("timed out") {
        Some(LlmError::RequestTimedOut)
    } else if lower.contains("401") || lower.contains("unauthorized") {
        Some(LlmError::Unauthorized)
    } else {
        None
    }
}
