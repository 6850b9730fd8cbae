//! Server configuration.
//!
//! Configuration comes from environment variables, with `.env` files loaded
//! by the binary before this module runs. Every knob has a default except
//! the upstream API key, which must be present.
//!
//! # Example
//! ```rust,no_run
//! use relay_gateway::config::ServerConfig;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = ServerConfig::from_env()?;
//! println!("Relay listening on {}", config.address());
//! # Ok(())
//! # }
//! ```

use std::env;

use crate::core::upstream::openai::{
    DEFAULT_CONNECT_TIMEOUT_MS, DEFAULT_REALTIME_MODEL, OPENAI_REALTIME_URL,
};
use crate::errors::ConfigError;

/// Default bind address.
pub const DEFAULT_HOST: &str = "0.0.0.0";
/// Default listen port.
pub const DEFAULT_PORT: u16 = 8081;
/// Default WebSocket endpoint path.
pub const DEFAULT_WS_PATH: &str = "/";

/// Relay server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    // Server settings
    pub host: String,
    pub port: u16,
    /// Path the relay accepts WebSocket upgrades on; every other path is
    /// rejected before the upgrade
    pub ws_path: String,

    // Upstream settings
    pub openai_api_key: String,
    pub model: String,
    pub upstream_url: String,
    pub connect_timeout_ms: u64,
}

impl ServerConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        let openai_api_key = env::var("OPENAI_API_KEY")
            .ok()
            .filter(|v| !v.trim().is_empty())
            .ok_or(ConfigError::Missing("OPENAI_API_KEY"))?;

        let config = Self {
            host: env_or("RELAY_HOST", DEFAULT_HOST),
            port: parse_env("RELAY_PORT", DEFAULT_PORT)?,
            ws_path: env_or("RELAY_WS_PATH", DEFAULT_WS_PATH),
            openai_api_key,
            model: env_or("OPENAI_REALTIME_MODEL", DEFAULT_REALTIME_MODEL),
            upstream_url: env_or("OPENAI_REALTIME_URL", OPENAI_REALTIME_URL),
            connect_timeout_ms: parse_env(
                "UPSTREAM_CONNECT_TIMEOUT_MS",
                DEFAULT_CONNECT_TIMEOUT_MS,
            )?,
        };

        config.validate()?;
        Ok(config)
    }

    /// Validate field constraints beyond type parsing.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.ws_path.starts_with('/') {
            return Err(ConfigError::Invalid {
                key: "RELAY_WS_PATH",
                message: format!("must start with '/', got {:?}", self.ws_path),
            });
        }
        if self.connect_timeout_ms == 0 {
            return Err(ConfigError::Invalid {
                key: "UPSTREAM_CONNECT_TIMEOUT_MS",
                message: "must be greater than zero".to_string(),
            });
        }
        if !self.upstream_url.starts_with("wss://") && !self.upstream_url.starts_with("ws://") {
            return Err(ConfigError::Invalid {
                key: "OPENAI_REALTIME_URL",
                message: format!("must be a ws:// or wss:// url, got {:?}", self.upstream_url),
            });
        }
        Ok(())
    }

    /// Socket address string the server binds to.
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Short, loggable form of the API key. Never log the full key.
    pub fn key_prefix(&self) -> String {
        let prefix: String = self.openai_api_key.chars().take(3).collect();
        format!("{prefix}...")
    }
}

fn env_or(key: &str, default: &str) -> String {
    env::var(key)
        .ok()
        .filter(|v| !v.trim().is_empty())
        .unwrap_or_else(|| default.to_string())
}

fn parse_env<T>(key: &'static str, default: T) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match env::var(key) {
        Ok(raw) if !raw.trim().is_empty() => {
            raw.trim().parse().map_err(|e| ConfigError::Invalid {
                key,
                message: format!("{e}"),
            })
        }
        _ => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_config() -> ServerConfig {
        ServerConfig {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            ws_path: DEFAULT_WS_PATH.to_string(),
            openai_api_key: "sk-test-key".to_string(),
            model: DEFAULT_REALTIME_MODEL.to_string(),
            upstream_url: OPENAI_REALTIME_URL.to_string(),
            connect_timeout_ms: DEFAULT_CONNECT_TIMEOUT_MS,
        }
    }

    #[test]
    fn test_address_joins_host_and_port() {
        let config = test_config();
        assert_eq!(config.address(), "0.0.0.0:8081");
    }

    #[test]
    fn test_key_prefix_truncates() {
        let config = test_config();
        assert_eq!(config.key_prefix(), "sk-...");
        assert!(!config.key_prefix().contains("test-key"));
    }

    #[test]
    fn test_key_prefix_handles_short_key() {
        let mut config = test_config();
        config.openai_api_key = "ab".to_string();
        assert_eq!(config.key_prefix(), "ab...");
    }

    #[test]
    fn test_validate_rejects_relative_path() {
        let mut config = test_config();
        config.ws_path = "realtime".to_string();
        assert!(matches!(
            config.validate(),
            Err(ConfigError::Invalid { key: "RELAY_WS_PATH", .. })
        ));
    }

    #[test]
    fn test_validate_rejects_zero_timeout() {
        let mut config = test_config();
        config.connect_timeout_ms = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_http_upstream_url() {
        let mut config = test_config();
        config.upstream_url = "https://api.openai.com/v1/realtime".to_string();
        assert!(matches!(
            config.validate(),
            Err(ConfigError::Invalid { key: "OPENAI_REALTIME_URL", .. })
        ));
    }

    #[test]
    fn test_validate_accepts_defaults() {
        assert!(test_config().validate().is_ok());
    }
}
