//! WebSocket request handlers
//!
//! - `relay` - Realtime relay WebSocket (downstream clients to the OpenAI
//!   Realtime API)

pub mod relay;

// Re-export commonly used handlers for convenient access
pub use relay::relay_handler;
