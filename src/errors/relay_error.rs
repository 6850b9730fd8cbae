//! Error taxonomy for the relay core.
//!
//! Connect-time failures (`ConnectionFailed`, `AuthenticationFailed`,
//! `Timeout`) close the downstream connection before any relaying begins.
//! Post-connect transmit failures (`SendFailed`, `NotConnected`) are fatal
//! for the owning session only. Per-frame protocol errors (`MalformedFrame`,
//! `MissingType`) are recovered locally: log the frame, drop it, keep the
//! session alive.

use thiserror::Error;

/// Errors that can occur during relay operations.
#[derive(Debug, Error)]
pub enum RelayError {
    /// Upstream endpoint unreachable or handshake rejected
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// Upstream rejected the credential
    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    /// Upstream connect attempt timed out
    #[error("Connect timed out after {0}ms")]
    Timeout(u64),

    /// Transmit failure after a successful connect
    #[error("Send failed: {0}")]
    SendFailed(String),

    /// Send attempted before the upstream session is ready
    #[error("Not connected")]
    NotConnected,

    /// Frame is not valid JSON
    #[error("Malformed frame: {0}")]
    MalformedFrame(String),

    /// Frame is valid JSON but carries no `type` discriminant
    #[error("Frame missing type discriminant")]
    MissingType,

    /// Serialization failure at a relay boundary
    #[error("Serialization error: {0}")]
    SerializationError(String),
}

/// Result type for relay operations.
pub type RelayResult<T> = Result<T, RelayError>;
