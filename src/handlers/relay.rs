//! Relay WebSocket handler
//!
//! Accepts a downstream WebSocket connection and wires it to a fresh
//! upstream realtime session. Text frames flow upstream through the relay
//! coordinator; server events flow back verbatim through a dedicated sender
//! task so downstream writes never interleave.

use axum::{
    extract::{
        State,
        ws::{Message, WebSocket, WebSocketUpgrade},
    },
    response::Response,
};
use futures::{SinkExt, StreamExt};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::core::relay::{RelaySession, SessionEvent};
use crate::core::upstream::{ClientFrame, OpenAiUpstream, TrackOffset, UpstreamConfig, UpstreamSession};
use crate::state::AppState;

/// Channel buffer size for per-session message routing
const CHANNEL_BUFFER_SIZE: usize = 1024;

/// Maximum WebSocket message size (10 MB)
const MAX_WS_MESSAGE_SIZE: usize = 10 * 1024 * 1024;

/// Control frame a client sends when playback is interrupted locally.
/// Consumed by the relay, never forwarded verbatim.
const INTERRUPT_EVENT_TYPE: &str = "relay.interrupt";

/// Outbound traffic toward the downstream connection.
enum DownstreamRoute {
    /// A server event, forwarded as raw JSON text
    Event(String),
    /// Close the connection
    Close,
}

/// Relay WebSocket handler
///
/// Upgrades the HTTP connection to WebSocket and hands it to a dedicated
/// relay session task.
pub async fn relay_handler(ws: WebSocketUpgrade, State(state): State<Arc<AppState>>) -> Response {
    info!("Relay WebSocket connection upgrade requested");

    ws.max_message_size(MAX_WS_MESSAGE_SIZE)
        .on_upgrade(move |socket| handle_relay_socket(socket, state))
}

/// Drive one relayed session over an accepted WebSocket.
async fn handle_relay_socket(socket: WebSocket, app_state: Arc<AppState>) {
    let session_id = uuid::Uuid::new_v4().to_string();
    info!(session_id = %session_id, "Relay WebSocket connection established");

    let (mut sender, mut receiver) = socket.split();
    let (downstream_tx, mut downstream_rx) = mpsc::channel::<DownstreamRoute>(CHANNEL_BUFFER_SIZE);
    let (event_tx, mut event_rx) = mpsc::channel::<SessionEvent>(CHANNEL_BUFFER_SIZE);

    // Sender task: the only writer to the downstream socket, so server
    // events reach the client in the order they were received
    let sender_task = tokio::spawn(async move {
        while let Some(route) = downstream_rx.recv().await {
            let result = match route {
                DownstreamRoute::Event(json) => sender.send(Message::Text(json.into())).await,
                DownstreamRoute::Close => {
                    let _ = sender.send(Message::Close(None)).await;
                    break;
                }
            };

            if let Err(e) = result {
                debug!("Failed to send WebSocket message: {}", e);
                break;
            }
        }
    });

    // Reader task: parse downstream frames and feed the session event stream
    let reader_event_tx = event_tx.clone();
    let reader_session_id = session_id.clone();
    let reader_task = tokio::spawn(async move {
        while let Some(msg_result) = receiver.next().await {
            match msg_result {
                Ok(Message::Text(text)) => {
                    if let Some(event) = classify_text_frame(&text, &reader_session_id) {
                        if reader_event_tx.send(event).await.is_err() {
                            break;
                        }
                    }
                }
                Ok(Message::Binary(data)) => {
                    // Protocol is text-only JSON
                    warn!(
                        session_id = %reader_session_id,
                        bytes = data.len(),
                        "Dropping unexpected binary frame"
                    );
                }
                Ok(Message::Close(_)) => {
                    info!(session_id = %reader_session_id, "Relay WebSocket close received");
                    break;
                }
                Ok(Message::Ping(_)) | Ok(Message::Pong(_)) => {}
                Err(e) => {
                    warn!(session_id = %reader_session_id, "Relay WebSocket error: {}", e);
                    break;
                }
            }
        }
        // An errored or vanished socket counts as a downstream close too
        let _ = reader_event_tx.send(SessionEvent::DownstreamClosed).await;
    });

    // Upstream session, with callbacks registered before any connect
    let mut upstream = match build_upstream(&app_state) {
        Ok(upstream) => upstream,
        Err(e) => {
            warn!(session_id = %session_id, error = %e, "Failed to build upstream session");
            let _ = downstream_tx.send(DownstreamRoute::Close).await;
            reader_task.abort();
            let _ = sender_task.await;
            return;
        }
    };

    let tx_clone = downstream_tx.clone();
    upstream.on_server_event(Arc::new(move |frame| {
        let tx = tx_clone.clone();
        Box::pin(async move {
            let _ = tx.send(DownstreamRoute::Event(frame.raw)).await;
        })
    }));

    let tx_clone = event_tx.clone();
    upstream.on_closed(Arc::new(move || {
        let tx = tx_clone.clone();
        Box::pin(async move {
            let _ = tx.send(SessionEvent::UpstreamClosed).await;
        })
    }));

    let mut session = RelaySession::new(session_id.clone(), upstream);
    if let Err(e) = session.run(&mut event_rx).await {
        warn!(session_id = %session_id, error = %e, "Relay session ended with error");
    }

    // Joint teardown: the session already closed the upstream side; close
    // the downstream side and stop the socket tasks
    let _ = downstream_tx.send(DownstreamRoute::Close).await;
    reader_task.abort();
    let _ = sender_task.await;

    info!(session_id = %session_id, "Relay WebSocket connection terminated");
}

/// Build a not-yet-connected upstream session from server configuration.
fn build_upstream(app_state: &AppState) -> crate::errors::RelayResult<OpenAiUpstream> {
    let config = &app_state.config;
    let mut upstream_config =
        UpstreamConfig::new(config.openai_api_key.clone(), config.model.clone())?;
    upstream_config.url = config.upstream_url.clone();
    upstream_config.connect_timeout_ms = config.connect_timeout_ms;
    Ok(OpenAiUpstream::new(upstream_config))
}

/// Turn a downstream text frame into a session event.
///
/// Malformed frames and interrupt frames missing their item id are logged
/// and dropped; the session keeps running either way.
fn classify_text_frame(text: &str, session_id: &str) -> Option<SessionEvent> {
    let frame = match ClientFrame::parse(text) {
        Ok(frame) => frame,
        Err(e) => {
            warn!(session_id = %session_id, "Dropping malformed client frame: {}", e);
            return None;
        }
    };

    if frame.event_type == INTERRUPT_EVENT_TYPE {
        return match parse_interrupt(&frame) {
            Some(offset) => Some(SessionEvent::Interrupt(offset)),
            None => {
                warn!(session_id = %session_id, "Dropping interrupt without item_id");
                None
            }
        };
    }

    Some(SessionEvent::Frame(frame))
}

/// Extract the playback offset from an interrupt control frame.
fn parse_interrupt(frame: &ClientFrame) -> Option<TrackOffset> {
    let item_id = frame.payload.get("item_id")?.as_str()?.to_string();
    let sample_offset = frame
        .payload
        .get("sample_offset")
        .and_then(|v| v.as_u64())
        .unwrap_or(0);
    Some(TrackOffset {
        item_id,
        sample_offset,
    })
}
