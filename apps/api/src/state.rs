use std::sync::Arc;

use crate::config::{AppConfig, ConfigError, ProviderConfig};

type Lookup = Arc<dyn Fn(&str) -> Option<String> + Send + Sync>;

/// Where request handlers read provider settings from.
#[derive(Clone)]
pub enum ProviderSource {
    /// Process environment, re-read on every request.
    Env,
    /// Fixed key lookup, used by router tests.
    Lookup(Lookup),
}

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    pub config: AppConfig,
    pub provider_source: ProviderSource,
}

impl AppState {
    pub fn new(config: AppConfig) -> Self {
        Self {
            config,
            provider_source: ProviderSource::Env,
        }
    }

    /// A fresh, immutable provider config for one analysis.
    pub fn provider_config(&self) -> Result<ProviderConfig, ConfigError> {
        match &self.provider_source {
            ProviderSource::Env => ProviderConfig::from_env(),
            ProviderSource::Lookup(lookup) => ProviderConfig::from_lookup(|key| lookup(key)),
        }
    }
}
