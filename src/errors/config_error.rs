//! Configuration validation errors.

use thiserror::Error;

/// Errors raised while loading or validating server configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A required setting is absent from the environment
    #[error("Missing required configuration: {0}")]
    Missing(&'static str),

    /// A setting is present but cannot be parsed
    #[error("Invalid value for {key}: {message}")]
    Invalid {
        /// Configuration key
        key: &'static str,
        /// Why the value was rejected
        message: String,
    },
}
