//! Relay WebSocket route configuration
//!
//! The relay exposes exactly one endpoint: a WebSocket upgrade on the
//! configured path. Requests for any other path are refused before any
//! upstream resource is touched.

use axum::{
    Router,
    http::{StatusCode, Uri},
    routing::get,
};
use tower_http::trace::TraceLayer;
use tracing::warn;

use crate::handlers::relay::relay_handler;
use crate::state::AppState;
use std::sync::Arc;

/// Create the relay router.
///
/// # Endpoint
///
/// `GET <ws_path>` - WebSocket upgrade for the realtime relay
///
/// # Protocol
///
/// After the upgrade, clients exchange UTF-8 JSON events carrying a `type`
/// field. Client events are forwarded to the upstream realtime API
/// unchanged; server events come back verbatim. The one relay-level control
/// frame is `relay.interrupt`, which cancels the in-flight response:
///
/// ```json
/// {"type": "relay.interrupt", "item_id": "item_42", "sample_offset": 24000}
/// ```
pub fn create_relay_router(ws_path: &str) -> Router<Arc<AppState>> {
    Router::new()
        .route(ws_path, get(relay_handler))
        .fallback(reject_handler)
        .layer(TraceLayer::new_for_http())
}

/// Refuse connections on any path other than the relay endpoint.
async fn reject_handler(uri: Uri) -> StatusCode {
    warn!(path = %uri.path(), "Rejecting connection on unknown path");
    StatusCode::NOT_FOUND
}
