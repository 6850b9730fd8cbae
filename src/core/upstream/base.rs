//! Base trait and types for upstream realtime sessions.
//!
//! An upstream session owns one logical connection to a remote realtime
//! conversation API. The relay core only depends on this trait; the wire
//! protocol lives in the provider implementation.
//!
//! # Event surface
//!
//! Subscriptions are a fixed capability interface rather than dynamic
//! pattern matching: `on_server_event` receives every inbound server event
//! (the wildcard subscription) and `on_closed` fires once when the remote
//! session ends.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::errors::{RelayError, RelayResult};

// =============================================================================
// Frame Types
// =============================================================================

/// A client event accepted from the downstream connection.
///
/// The payload is the complete original JSON object; relaying is
/// pass-through, so nothing beyond the `type` discriminant is interpreted.
#[derive(Debug, Clone)]
pub struct ClientFrame {
    /// Event type discriminant
    pub event_type: String,
    /// Full original event, untouched
    pub payload: serde_json::Value,
}

impl ClientFrame {
    /// Parse a downstream text frame into a client event.
    ///
    /// Frames must be JSON objects carrying a string `type` field; anything
    /// else is a protocol error the caller logs and drops.
    pub fn parse(text: &str) -> RelayResult<Self> {
        let payload: serde_json::Value = serde_json::from_str(text)
            .map_err(|e| RelayError::MalformedFrame(e.to_string()))?;

        let event_type = payload
            .get("type")
            .and_then(|t| t.as_str())
            .ok_or(RelayError::MissingType)?
            .to_string();

        Ok(Self {
            event_type,
            payload,
        })
    }

    /// Serialize the frame back to the wire representation.
    pub fn to_json(&self) -> RelayResult<String> {
        serde_json::to_string(&self.payload)
            .map_err(|e| RelayError::SerializationError(e.to_string()))
    }
}

/// A server event received from the upstream session.
///
/// The raw JSON text is preserved so the relay can forward it downstream
/// verbatim; the type discriminant is extracted only for dispatch and logs.
#[derive(Debug, Clone)]
pub struct ServerEventFrame {
    /// Event type discriminant
    pub event_type: String,
    /// Raw JSON text as received from the upstream socket
    pub raw: String,
}

impl ServerEventFrame {
    /// Validate an inbound upstream text frame and extract its discriminant.
    ///
    /// The raw text is kept untouched for verbatim forwarding. Malformed
    /// frames are a protocol error the reader logs and drops; they never
    /// terminate the session.
    pub fn parse(text: &str) -> RelayResult<Self> {
        let value: serde_json::Value = serde_json::from_str(text)
            .map_err(|e| RelayError::MalformedFrame(e.to_string()))?;

        let event_type = value
            .get("type")
            .and_then(|t| t.as_str())
            .ok_or(RelayError::MissingType)?
            .to_string();

        Ok(Self {
            event_type,
            raw: text.to_string(),
        })
    }
}

/// Identifies where playback was interrupted: which in-flight item, and the
/// sample offset within it. The offset is opaque to the relay; the provider
/// converts it to whatever its truncation operation requires.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackOffset {
    /// Item whose audio was playing when the interruption happened
    pub item_id: String,
    /// Sample offset into that item's audio
    pub sample_offset: u64,
}

// =============================================================================
// Callback Types
// =============================================================================

/// Callback invoked for every inbound server event, in arrival order.
pub type ServerEventCallback =
    Arc<dyn Fn(ServerEventFrame) -> Pin<Box<dyn Future<Output = ()> + Send>> + Send + Sync>;

/// Callback invoked once when the upstream session closes.
pub type ClosedCallback =
    Arc<dyn Fn() -> Pin<Box<dyn Future<Output = ()> + Send>> + Send + Sync>;

// =============================================================================
// Base Trait
// =============================================================================

/// One logical session to a remote realtime API.
///
/// Implementations make a single connection attempt per session; retry
/// policy belongs to the caller, not the session. `disconnect` is idempotent
/// and safe on a never-connected session.
#[async_trait]
pub trait UpstreamSession: Send + Sync {
    /// Establish the remote session. One attempt; no retry.
    async fn connect(&mut self) -> RelayResult<()>;

    /// Close the remote session. Idempotent.
    async fn disconnect(&mut self) -> RelayResult<()>;

    /// Whether events may be sent.
    fn is_ready(&self) -> bool;

    /// Transmit a single client event. Rejects with
    /// [`RelayError::NotConnected`] before `is_ready` is true.
    async fn send_event(&mut self, frame: &ClientFrame) -> RelayResult<()>;

    /// Request cancellation of the in-flight response identified by `offset`.
    ///
    /// Best-effort: if the remote response already completed this is a no-op
    /// and must not surface an error to the caller.
    async fn cancel_response(&mut self, offset: TrackOffset) -> RelayResult<()>;

    /// Subscribe to every inbound server event.
    fn on_server_event(&mut self, callback: ServerEventCallback);

    /// Subscribe to upstream session close.
    fn on_closed(&mut self, callback: ClosedCallback);
}
