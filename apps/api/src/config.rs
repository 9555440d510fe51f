use std::time::Duration;

use anyhow::{Context, Result};
use thiserror::Error;

use crate::extraction::ExtractionBackend;

pub const DEFAULT_API_BASE: &str = "https://api.mistral.ai/v1";
pub const DEFAULT_MODEL: &str = "mistral-small-latest";
pub const DEFAULT_OCR_MODEL: &str = "mistral-ocr-latest";
const DEFAULT_TEMPERATURE: f32 = 0.2;
const DEFAULT_MAX_TOKENS: u32 = 1500;
const DEFAULT_TIMEOUT_SECS: u64 = 120;
pub const DEFAULT_OCR_LANGUAGE: &str = "eng";

const API_KEY_VAR: &str = "MISTRAL_API_KEY";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0} not found. Please add it to your environment variables.")]
    MissingCredential(&'static str),

    #[error("Invalid value for {key}: {reason}")]
    Invalid { key: &'static str, reason: String },
}

/// Process-level configuration loaded from environment variables at startup.
/// Holds nothing secret: the credential is read per invocation into `ProviderConfig`.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub port: u16,
    pub rust_log: String,
    pub extraction_backend: ExtractionBackend,
    /// Tesseract language code(s) for the local OCR stage, e.g. `eng` or `eng+fra`.
    pub ocr_language: String,
}

impl AppConfig {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        let extraction_backend = match std::env::var("CVFIT_EXTRACTION_BACKEND") {
            Ok(raw) => raw
                .parse::<ExtractionBackend>()
                .map_err(anyhow::Error::msg)
                .context("CVFIT_EXTRACTION_BACKEND must be 'local' or 'remote'")?,
            Err(_) => ExtractionBackend::default(),
        };

        Ok(AppConfig {
            port: std::env::var("PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse::<u16>()
                .context("PORT must be a valid port number")?,
            rust_log: std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
            extraction_backend,
            ocr_language: std::env::var("CVFIT_OCR_LANG")
                .ok()
                .map(|l| l.trim().to_string())
                .filter(|l| !l.is_empty())
                .unwrap_or_else(|| DEFAULT_OCR_LANGUAGE.to_string()),
        })
    }
}

/// Settings for one call against the remote model provider.
///
/// Built once per analysis invocation and passed down by reference; nothing
/// below the pipeline driver reads the environment.
#[derive(Clone)]
pub struct ProviderConfig {
    pub api_base: String,
    pub model_name: String,
    pub ocr_model: String,
    pub temperature: f32,
    pub max_tokens: u32,
    pub request_timeout: Duration,
    api_key: String,
}

impl std::fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderConfig")
            .field("api_base", &self.api_base)
            .field("model_name", &self.model_name)
            .field("ocr_model", &self.ocr_model)
            .field("temperature", &self.temperature)
            .field("max_tokens", &self.max_tokens)
            .field("request_timeout", &self.request_timeout)
            .field("api_key", &"<redacted>")
            .finish()
    }
}

impl ProviderConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the config from an arbitrary key lookup. `from_env` is this over
    /// `std::env::var`; tests pass a map.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let api_key = lookup(API_KEY_VAR)
            .map(|k| k.trim().to_string())
            .filter(|k| !k.is_empty())
            .ok_or(ConfigError::MissingCredential(API_KEY_VAR))?;

        let temperature = match lookup("MISTRAL_TEMPERATURE") {
            Some(raw) => parse_temperature(&raw)?,
            None => DEFAULT_TEMPERATURE,
        };

        let max_tokens = match lookup("MISTRAL_MAX_TOKENS") {
            Some(raw) => match raw.trim().parse::<u32>() {
                Ok(n) if n > 0 => n,
                _ => {
                    return Err(ConfigError::Invalid {
                        key: "MISTRAL_MAX_TOKENS",
                        reason: format!("expected a positive integer, got '{raw}'"),
                    })
                }
            },
            None => DEFAULT_MAX_TOKENS,
        };

        let timeout_secs = match lookup("CVFIT_REQUEST_TIMEOUT_SECS") {
            Some(raw) => match raw.trim().parse::<u64>() {
                Ok(n) if n > 0 => n,
                _ => {
                    return Err(ConfigError::Invalid {
                        key: "CVFIT_REQUEST_TIMEOUT_SECS",
                        reason: format!("expected a positive number of seconds, got '{raw}'"),
                    })
                }
            },
            None => DEFAULT_TIMEOUT_SECS,
        };

        Ok(ProviderConfig {
            api_base: lookup("MISTRAL_API_BASE")
                .map(|b| b.trim_end_matches('/').to_string())
                .unwrap_or_else(|| DEFAULT_API_BASE.to_string()),
            model_name: lookup("MISTRAL_MODEL").unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            ocr_model: lookup("MISTRAL_OCR_MODEL")
                .unwrap_or_else(|| DEFAULT_OCR_MODEL.to_string()),
            temperature,
            max_tokens,
            request_timeout: Duration::from_secs(timeout_secs),
            api_key,
        })
    }

    pub fn api_key(&self) -> &str {
        &self.api_key
    }
}

fn parse_temperature(raw: &str) -> Result<f32, ConfigError> {
    match raw.trim().parse::<f32>() {
        Ok(t) if (0.0..=1.0).contains(&t) => Ok(t),
        _ => Err(ConfigError::Invalid {
            key: "MISTRAL_TEMPERATURE",
            reason: format!("expected a number between 0 and 1, got '{raw}'"),
        }),
    }
}
