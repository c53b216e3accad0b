use std::time::Duration;

use crate::provider::Provider;

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(120);

/// Settings for talking to the completion endpoint.
#[derive(Debug, Clone)]
pub struct SyncConfig {
    pub provider: Provider,
    /// Overrides the provider's default model
    pub model: Option<String>,
    /// Overrides the provider's endpoint URL
    pub api_url: Option<String>,
    pub timeout: Duration,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            provider: Provider::default(),
            model: None,
            api_url: None,
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

impl SyncConfig {
    pub fn new(provider: Provider) -> Self {
        Self {
            provider,
            ..Self::default()
        }
    }

    pub fn model(&self) -> &str {
        self.model
            .as_deref()
            .unwrap_or_else(|| self.provider.config().model)
    }

    pub fn api_url(&self) -> &str {
        self.api_url
            .as_deref()
            .unwrap_or_else(|| self.provider.config().api_url)
    }
}
