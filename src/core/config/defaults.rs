use std::time::Duration;

use crate::core::config::data::Config;
use crate::core::frame_decoder::Dialect;
use crate::core::orchestrator::OrchestratorSettings;

pub const DEFAULT_ENDPOINT: &str = "http://localhost:11434";
pub const DEFAULT_MODEL: &str = "llama3.1";
pub const DEFAULT_BACKEND_URL: &str = "http://localhost:8000";
pub const DEFAULT_STALL_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_FALLBACK_TIMEOUT_SECS: u64 = 20;

/// Bearer token for the chat endpoint.
pub const API_KEY_ENV: &str = "VASTUCHAT_API_KEY";

/// Values given on the command line, which win over the config file.
#[derive(Debug, Clone, Default)]
pub struct SettingsOverrides {
    pub endpoint: Option<String>,
    pub model: Option<String>,
    pub dialect: Option<Dialect>,
}

impl Config {
    pub fn endpoint(&self) -> &str {
        self.endpoint.as_deref().unwrap_or(DEFAULT_ENDPOINT)
    }

    pub fn model(&self) -> &str {
        self.model.as_deref().unwrap_or(DEFAULT_MODEL)
    }

    pub fn backend_url(&self) -> &str {
        self.backend_url.as_deref().unwrap_or(DEFAULT_BACKEND_URL)
    }

    pub fn stall_timeout(&self) -> Duration {
        Duration::from_secs(
            self.stall_timeout_secs
                .unwrap_or(DEFAULT_STALL_TIMEOUT_SECS),
        )
    }

    pub fn fallback_enabled(&self) -> bool {
        self.fallback_enabled.unwrap_or(false)
    }

    pub fn fallback_timeout(&self) -> Duration {
        Duration::from_secs(
            self.fallback_timeout_secs
                .unwrap_or(DEFAULT_FALLBACK_TIMEOUT_SECS),
        )
    }

    /// Explicit dialect first, then the port heuristic.
    pub fn dialect_for(&self, endpoint: &str) -> Dialect {
        Dialect::resolve(self.dialect, endpoint)
    }

    pub fn resolve_settings(&self, overrides: &SettingsOverrides) -> OrchestratorSettings {
        let endpoint = overrides
            .endpoint
            .clone()
            .unwrap_or_else(|| self.endpoint().to_string());
        let dialect = overrides
            .dialect
            .unwrap_or_else(|| self.dialect_for(&endpoint));
        OrchestratorSettings {
            model: overrides
                .model
                .clone()
                .unwrap_or_else(|| self.model().to_string()),
            dialect,
            stall_timeout: self.stall_timeout(),
            fallback_enabled: self.fallback_enabled(),
            fallback_timeout: self.fallback_timeout(),
            backend_url: self.backend_url().to_string(),
            endpoint,
        }
    }
}

/// API key from the environment; blank values count as unset.
pub fn api_key_from_env() -> Option<String> {
    std::env::var(API_KEY_ENV)
        .ok()
        .filter(|key| !key.trim().is_empty())
}
