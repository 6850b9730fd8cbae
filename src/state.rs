//! Shared application state.

use std::sync::Arc;

use crate::config::ServerConfig;

/// State shared across connection handlers.
///
/// Each accepted connection gets its own relay session; the shared state
/// carries only the immutable configuration they are built from.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<ServerConfig>,
}

impl AppState {
    pub fn new(config: ServerConfig) -> Self {
        Self {
            config: Arc::new(config),
        }
    }
}
