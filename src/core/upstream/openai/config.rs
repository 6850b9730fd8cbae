//! OpenAI Realtime API session configuration.

use crate::errors::{RelayError, RelayResult};

/// OpenAI Realtime API WebSocket endpoint.
pub const OPENAI_REALTIME_URL: &str = "wss://api.openai.com/v1/realtime";

/// Audio sample rate the Realtime API streams at.
pub const OPENAI_REALTIME_SAMPLE_RATE: u64 = 24000;

/// Default Realtime model.
pub const DEFAULT_REALTIME_MODEL: &str = "gpt-4o-realtime-preview";

/// Default upstream connect timeout.
pub const DEFAULT_CONNECT_TIMEOUT_MS: u64 = 10_000;

/// Configuration for one upstream OpenAI Realtime session.
#[derive(Debug, Clone)]
pub struct UpstreamConfig {
    /// API key for authentication
    pub api_key: String,
    /// Realtime model to request
    pub model: String,
    /// WebSocket endpoint base URL (overridable for tests)
    pub url: String,
    /// Connect timeout in milliseconds
    pub connect_timeout_ms: u64,
}

impl UpstreamConfig {
    /// Build a config for the production endpoint.
    ///
    /// Fails when the key is empty so no session is ever attempted without
    /// a credential.
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> RelayResult<Self> {
        let api_key = api_key.into();
        if api_key.is_empty() {
            return Err(RelayError::AuthenticationFailed(
                "API key is required".to_string(),
            ));
        }

        let model = model.into();
        let model = if model.is_empty() {
            DEFAULT_REALTIME_MODEL.to_string()
        } else {
            model
        };

        Ok(Self {
            api_key,
            model,
            url: OPENAI_REALTIME_URL.to_string(),
            connect_timeout_ms: DEFAULT_CONNECT_TIMEOUT_MS,
        })
    }

    /// Full WebSocket URL with the model query parameter.
    pub fn ws_url(&self) -> String {
        format!("{}?model={}", self.url, self.model)
    }
}
