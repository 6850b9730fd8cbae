//! Upstream session clients.
//!
//! The relay core depends only on [`base::UpstreamSession`]; provider wire
//! protocols live in their own submodules.

pub mod base;
pub mod openai;

pub use base::{
    ClientFrame, ClosedCallback, ServerEventCallback, ServerEventFrame, TrackOffset,
    UpstreamSession,
};
pub use openai::{
    DEFAULT_REALTIME_MODEL, OPENAI_REALTIME_SAMPLE_RATE, OPENAI_REALTIME_URL, OpenAiUpstream,
    UpstreamConfig,
};
