//! OpenAI Realtime API upstream implementation.

mod client;
mod config;
mod messages;

pub use client::OpenAiUpstream;
pub use config::{
    DEFAULT_CONNECT_TIMEOUT_MS, DEFAULT_REALTIME_MODEL, OPENAI_REALTIME_SAMPLE_RATE,
    OPENAI_REALTIME_URL, UpstreamConfig,
};
pub use messages::ClientEvent;
