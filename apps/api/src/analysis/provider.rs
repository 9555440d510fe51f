//! Analysis providers: a trait seam with one remote implementation.
//!
//! The pipeline only sees `&dyn AnalysisProvider`; adding a backend means a new
//! impl here, not a change to the driver.

use std::sync::Mutex;

use async_trait::async_trait;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::analysis::parser::{self, ParseFailure};
use crate::analysis::prompts::build_analysis_prompt;
use crate::config::{ProviderConfig, DEFAULT_MODEL};
use crate::llm_client::{LlmError, MistralClient};
use crate::models::report::{AnalysisRequest, AnalysisResult};

#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error(transparent)]
    Provider(#[from] LlmError),

    #[error(transparent)]
    UnparsableResponse(#[from] ParseFailure),
}

#[async_trait]
pub trait AnalysisProvider: Send + Sync {
    /// Short backend name, for logs and responses.
    fn name(&self) -> &'static str;

    async fn analyze(
        &self,
        request: &AnalysisRequest,
        config: &ProviderConfig,
    ) -> Result<AnalysisResult, AnalysisError>;

    /// The last raw model reply seen by this provider, kept whether or not it parsed.
    fn last_raw_response(&self) -> Option<String>;
}

pub const AVAILABLE_MODELS: [&str; 3] = [
    "mistral-large-latest",
    "mistral-medium-latest",
    "mistral-small-latest",
];

/// Mistral chat-completions backend.
#[derive(Default)]
pub struct MistralProvider {
    last_raw_response: Mutex<Option<String>>,
}

impl MistralProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn available_models() -> &'static [&'static str] {
        &AVAILABLE_MODELS
    }

    pub fn default_model() -> &'static str {
        DEFAULT_MODEL
    }

    fn remember_raw(&self, raw: &str) {
        if let Ok(mut slot) = self.last_raw_response.lock() {
            *slot = Some(raw.to_string());
        }
    }
}

#[async_trait]
impl AnalysisProvider for MistralProvider {
    fn name(&self) -> &'static str {
        "mistral"
    }

    async fn analyze(
        &self,
        request: &AnalysisRequest,
        config: &ProviderConfig,
    ) -> Result<AnalysisResult, AnalysisError> {
        if !AVAILABLE_MODELS.contains(&config.model_name.as_str()) {
            warn!(model = %config.model_name, "Model is not in the known model list, using it anyway");
        }

        let prompt = build_analysis_prompt(request);
        let client = MistralClient::new(config)?;

        info!(
            model = %config.model_name,
            metrics = request.selected_metrics().len(),
            prompt_chars = prompt.len(),
            "Requesting candidate analysis"
        );

        let raw = client.complete(&prompt, config).await?;
        self.remember_raw(&raw);
        debug!(raw = %raw, "Raw model reply");

        let result = parser::parse(&raw).map_err(|e| {
            warn!(reason = %e.reason, "Model reply could not be parsed");
            e
        })?;

        let missing = result.missing_metrics(request.selected_metrics());
        if !missing.is_empty() {
            warn!(?missing, "Model reply is missing requested metrics");
            return Err(ParseFailure {
                raw,
                reason: format!("missing metrics: {}", missing.join(", ")),
            }
            .into());
        }

        Ok(result)
    }

    fn last_raw_response(&self) -> Option<String> {
        self.last_raw_response.lock().ok().and_then(|slot| slot.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{Canned, FakeApi, VALID_REPLY};
    use axum::http::StatusCode;
    use std::time::Duration;

    fn request() -> AnalysisRequest {
        AnalysisRequest::new(
            "Looking for a Python backend engineer, 3+ years".to_string(),
            "Skills: Python, Django, PostgreSQL".to_string(),
            vec![],
        )
    }

    #[tokio::test]
    async fn test_successful_analysis_returns_result_and_keeps_raw() {
        let api = FakeApi::chat_only(Canned::chat_reply(VALID_REPLY)).await;
        let provider = MistralProvider::new();

        let result = provider.analyze(&request(), &api.provider_config()).await.unwrap();
        assert_eq!(result.overall_score, 78);
        assert_eq!(result.metrics.len(), 4);
        assert_eq!(provider.last_raw_response().as_deref(), Some(VALID_REPLY));
    }

    #[tokio::test]
    async fn test_request_carries_model_prompt_and_bearer_token() {
        let api = FakeApi::chat_only(Canned::chat_reply(VALID_REPLY)).await;
        let config = api.provider_config_with(&[
            ("MISTRAL_MODEL", "mistral-large-latest"),
            ("MISTRAL_MAX_TOKENS", "900"),
        ]);
        MistralProvider::new().analyze(&request(), &config).await.unwrap();

        let requests = api.requests();
        assert_eq!(requests.len(), 1);
        let sent = &requests[0];
        assert_eq!(sent.path, "/v1/chat/completions");
        assert_eq!(sent.authorization.as_deref(), Some("Bearer test-key"));
        assert_eq!(sent.body["model"], "mistral-large-latest");
        assert_eq!(sent.body["max_tokens"], 900);
        assert_eq!(sent.body["messages"][0]["role"], "user");
        assert!(sent.body["messages"][0]["content"]
            .as_str()
            .unwrap()
            .contains("Skills: Python, Django, PostgreSQL"));
        assert!(sent.body["temperature"].as_f64().unwrap() < 0.21);
    }

    #[tokio::test]
    async fn test_prose_wrapped_reply_is_accepted() {
        let reply = format!("Sure! Here is the JSON: {VALID_REPLY} Hope that helps!");
        let api = FakeApi::chat_only(Canned::chat_reply(&reply)).await;
        let result = MistralProvider::new()
            .analyze(&request(), &api.provider_config())
            .await
            .unwrap();
        assert_eq!(result.overall_score, 78);
    }

    #[tokio::test]
    async fn test_unparsable_reply_keeps_raw_text() {
        let api = FakeApi::chat_only(Canned::chat_reply("I am unable to score this CV.")).await;
        let provider = MistralProvider::new();

        let err = provider
            .analyze(&request(), &api.provider_config())
            .await
            .unwrap_err();
        match err {
            AnalysisError::UnparsableResponse(failure) => {
                assert_eq!(failure.raw, "I am unable to score this CV.")
            }
            other => panic!("expected UnparsableResponse, got {other:?}"),
        }
        assert_eq!(
            provider.last_raw_response().as_deref(),
            Some("I am unable to score this CV.")
        );
    }

    #[tokio::test]
    async fn test_missing_requested_metric_is_unparsable() {
        let reply = r#"{"overall_score": 60, "metrics": {"skills_match": 70},
                        "candidate_summary": "s", "analysis": "a"}"#;
        let api = FakeApi::chat_only(Canned::chat_reply(reply)).await;
        let err = MistralProvider::new()
            .analyze(&request(), &api.provider_config())
            .await
            .unwrap_err();
        match err {
            AnalysisError::UnparsableResponse(failure) => {
                assert!(failure.reason.contains("relevant_experience"));
                assert!(failure.raw.contains("skills_match"));
            }
            other => panic!("expected UnparsableResponse, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_remote_statuses_are_classified() {
        let cases = [
            (StatusCode::TOO_MANY_REQUESTS, "rate"),
            (StatusCode::SERVICE_UNAVAILABLE, "overloaded"),
            (StatusCode::UNAUTHORIZED, "unauthorized"),
        ];
        for (status, label) in cases {
            let api = FakeApi::chat_only(Canned::status(status, r#"{"message":"nope"}"#)).await;
            let err = MistralProvider::new()
                .analyze(&request(), &api.provider_config())
                .await
                .unwrap_err();
            let ok = match (&err, label) {
                (AnalysisError::Provider(LlmError::RateLimited), "rate") => true,
                (AnalysisError::Provider(LlmError::ServiceOverloaded), "overloaded") => true,
                (AnalysisError::Provider(LlmError::Unauthorized), "unauthorized") => true,
                _ => false,
            };
            assert!(ok, "status {status} produced {err:?}");
            assert_eq!(api.requests().len(), 1, "must not retry on {status}");
        }
    }

    #[tokio::test]
    async fn test_envelope_without_choices_is_unexpected_shape() {
        let api = FakeApi::chat_only(Canned::status(StatusCode::OK, r#"{"object":"error"}"#)).await;
        let err = MistralProvider::new()
            .analyze(&request(), &api.provider_config())
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            AnalysisError::Provider(LlmError::UnexpectedResponseShape(_))
        ));
    }

    #[tokio::test]
    async fn test_slow_remote_is_request_timed_out() {
        let api = FakeApi::chat_only(
            Canned::chat_reply(VALID_REPLY).delayed(Duration::from_secs(5)),
        )
        .await;
        let config = api.provider_config_with(&[("CVFIT_REQUEST_TIMEOUT_SECS", "1")]);
        let err = MistralProvider::new()
            .analyze(&request(), &config)
            .await
            .unwrap_err();
        assert!(matches!(err, AnalysisError::Provider(LlmError::RequestTimedOut)));
    }

    #[test]
    fn test_model_catalogue() {
        assert!(MistralProvider::available_models().contains(&MistralProvider::default_model()));
        assert_eq!(MistralProvider::new().name(), "mistral");
    }
}
