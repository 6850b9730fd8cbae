pub mod relay;
pub mod upstream;

// Re-export commonly used types for convenience
pub use relay::{PendingQueue, RelaySession, SessionEvent, SessionState};
pub use upstream::{
    ClientFrame, ClosedCallback, OpenAiUpstream, ServerEventCallback, ServerEventFrame,
    TrackOffset, UpstreamConfig, UpstreamSession,
};
