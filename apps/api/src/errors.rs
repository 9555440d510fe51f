use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::analysis::pipeline::PipelineError;
use crate::analysis::provider::AnalysisError;
use crate::config::ConfigError;
use crate::extraction::ExtractionError;
use crate::llm_client::LlmError;

/// Application-level error type.
/// Implements `IntoResponse` so Axum handlers can return `Result<T, AppError>`.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("{0}")]
    Validation(String),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("{0}")]
    DocumentUnreadable(String),

    #[error("{0}")]
    ExtractionFailed(String),

    #[error(transparent)]
    Llm(LlmError),

    #[error("{0}")]
    UnparsableResponse(String),
}

impl From<PipelineError> for AppError {
    fn from(err: PipelineError) -> Self {
        match err {
            PipelineError::EmptyJobDescription
            | PipelineError::MissingDocument
            | PipelineError::InvalidMetric(_) => {
                AppError::Validation(err.to_string())
            }
            PipelineError::Config(e) => AppError::Config(e),
            PipelineError::Extraction(ExtractionError::DocumentUnreadable(e)) => {
                AppError::DocumentUnreadable(e.to_string())
            }
            PipelineError::Extraction(ExtractionError::Remote(e)) => AppError::Llm(e),
            PipelineError::Extraction(e @ ExtractionError::NoUsableText { .. }) => {
                AppError::ExtractionFailed(e.to_string())
            }
            PipelineError::Analysis(AnalysisError::Provider(e)) => AppError::Llm(e),
            PipelineError::Analysis(AnalysisError::UnparsableResponse(failure)) => {
                AppError::UnparsableResponse(failure.raw)
            }
        }
    }
}

impl From<LlmError> for AppError {
    fn from(err: LlmError) -> Self {
        AppError::Llm(err)
    }
}

impl AppError {
    fn parts(&self) -> (StatusCode, &'static str, String) {
        match self {
            AppError::Validation(msg) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg.clone()),
            AppError::Config(e) => {
                tracing::error!("Configuration error: {e}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "CONFIG_ERROR",
                    e.to_string(),
                )
            }
            AppError::DocumentUnreadable(msg) => (
                StatusCode::BAD_REQUEST,
                "DOCUMENT_UNREADABLE",
                msg.clone(),
            ),
            AppError::ExtractionFailed(msg) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                "EXTRACTION_FAILED",
                msg.clone(),
            ),
            AppError::Llm(e) => {
                let (status, code) = match e {
                    LlmError::RateLimited => (StatusCode::TOO_MANY_REQUESTS, "RATE_LIMITED"),
                    LlmError::ServiceOverloaded => {
                        (StatusCode::SERVICE_UNAVAILABLE, "SERVICE_OVERLOADED")
                    }
                    LlmError::RequestTimedOut => (StatusCode::GATEWAY_TIMEOUT, "REQUEST_TIMED_OUT"),
                    LlmError::Unauthorized => (StatusCode::BAD_GATEWAY, "PROVIDER_UNAUTHORIZED"),
                    LlmError::UnexpectedResponseShape(_) => {
                        (StatusCode::BAD_GATEWAY, "UNEXPECTED_RESPONSE_SHAPE")
                    }
                    LlmError::Api { .. } | LlmError::Http(_) => {
                        (StatusCode::BAD_GATEWAY, "LLM_ERROR")
                    }
                };
                tracing::error!(code, "LLM error: {e}");
                (status, code, e.to_string())
            }
            AppError::UnparsableResponse(raw) => {
                tracing::error!("Unparsable model reply");
                (
                    StatusCode::BAD_GATEWAY,
                    "UNPARSABLE_RESPONSE",
                    format!("Could not parse LLM response as JSON. Raw output:\n{raw}"),
                )
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = self.parts();

        let body = Json(json!({
            "error": {
                "code": code,
                "message": message
            }
        }));

        (status, body).into_response()
    }
}
