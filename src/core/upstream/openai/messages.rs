//! OpenAI Realtime API events the relay constructs itself.
//!
//! Almost everything crossing the relay is pass-through JSON; the only
//! events built here are the cancellation pair sent when the downstream
//! side reports a playback interruption:
//!
//! - `conversation.item.truncate` - drop the superseded audio past the
//!   interruption point
//! - `response.cancel` - stop generation of the in-flight response

use serde::Serialize;

use crate::core::upstream::base::{ClientFrame, TrackOffset};
use crate::errors::{RelayError, RelayResult};

use super::config::OPENAI_REALTIME_SAMPLE_RATE;

/// Client events sent to the OpenAI Realtime API by the relay itself.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type")]
pub enum ClientEvent {
    /// Truncate a conversation item at the interruption point
    #[serde(rename = "conversation.item.truncate")]
    ConversationItemTruncate {
        /// Item ID
        item_id: String,
        /// Content index
        content_index: u32,
        /// Audio end in ms
        audio_end_ms: u64,
    },

    /// Cancel the current response
    #[serde(rename = "response.cancel")]
    ResponseCancel,
}

impl ClientEvent {
    /// Build the cancellation pair for an interrupted response.
    ///
    /// The sample offset is converted to milliseconds here because that is
    /// what the truncate operation takes on the wire; the relay itself never
    /// interprets the offset. The offset is client-supplied, so the
    /// conversion saturates instead of overflowing.
    pub fn cancellation(offset: &TrackOffset) -> [ClientEvent; 2] {
        let audio_end_ms = offset.sample_offset.saturating_mul(1000) / OPENAI_REALTIME_SAMPLE_RATE;
        [
            ClientEvent::ConversationItemTruncate {
                item_id: offset.item_id.clone(),
                content_index: 0,
                audio_end_ms,
            },
            ClientEvent::ResponseCancel,
        ]
    }

    /// Wrap this event as a relayable client frame.
    pub fn into_frame(self) -> RelayResult<ClientFrame> {
        let payload = serde_json::to_value(&self)
            .map_err(|e| RelayError::SerializationError(e.to_string()))?;
        let event_type = payload
            .get("type")
            .and_then(|t| t.as_str())
            .ok_or(RelayError::MissingType)?
            .to_string();
        Ok(ClientFrame {
            event_type,
            payload,
        })
    }
}
