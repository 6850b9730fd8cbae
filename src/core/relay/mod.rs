//! Relay session core.

pub mod queue;
pub mod session;

pub use queue::PendingQueue;
pub use session::{RelaySession, SessionEvent, SessionState};
