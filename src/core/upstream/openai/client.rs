//! OpenAI Realtime API upstream session.
//!
//! Implements [`UpstreamSession`] over the WebSocket Realtime protocol:
//!
//! - Endpoint: `wss://api.openai.com/v1/realtime?model=<model>`
//! - Framing: UTF-8 JSON events with a `type` discriminant
//!
//! One connection attempt per session. If the endpoint is unreachable, the
//! credential is rejected, or the handshake times out, the failure surfaces
//! to the caller and the session is done; retry policy belongs to whoever
//! owns the session, not to this client.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use tokio::sync::{Mutex, mpsc};
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::{self, Message};

use crate::core::upstream::base::{
    ClientFrame, ClosedCallback, ServerEventCallback, ServerEventFrame, TrackOffset,
    UpstreamSession,
};
use crate::errors::{RelayError, RelayResult};

use super::config::UpstreamConfig;
use super::messages::ClientEvent;

/// Channel capacity for the WebSocket writer.
const WS_CHANNEL_CAPACITY: usize = 256;

/// OpenAI Realtime upstream session.
///
/// Mutable state is `Arc`-wrapped so it can be shared with the spawned
/// socket task; the ready flag is an `AtomicBool` for lock-free checks.
pub struct OpenAiUpstream {
    config: UpstreamConfig,
    /// Ready flag, shared with the socket task
    connected: Arc<AtomicBool>,
    /// Outbound frame channel into the socket task
    ws_sender: Arc<Mutex<Option<mpsc::Sender<String>>>>,
    /// Wildcard server-event subscription
    server_event_callback: Arc<Mutex<Option<ServerEventCallback>>>,
    /// Close subscription, fired at most once
    closed_callback: Arc<Mutex<Option<ClosedCallback>>>,
    /// Guards the close notification
    closed_fired: Arc<AtomicBool>,
    /// Socket task handle
    task_handle: Arc<Mutex<Option<JoinHandle<()>>>>,
}

impl OpenAiUpstream {
    /// Create a session for the given configuration. Nothing connects until
    /// [`UpstreamSession::connect`] is called.
    pub fn new(config: UpstreamConfig) -> Self {
        Self {
            config,
            connected: Arc::new(AtomicBool::new(false)),
            ws_sender: Arc::new(Mutex::new(None)),
            server_event_callback: Arc::new(Mutex::new(None)),
            closed_callback: Arc::new(Mutex::new(None)),
            closed_fired: Arc::new(AtomicBool::new(false)),
            task_handle: Arc::new(Mutex::new(None)),
        }
    }

    /// Build the WebSocket handshake request with auth headers.
    fn build_request(&self) -> RelayResult<http::Request<()>> {
        let url = self.config.ws_url();
        let uri: http::Uri = url
            .parse()
            .map_err(|e| RelayError::ConnectionFailed(format!("invalid upstream url: {e}")))?;
        let host = uri
            .authority()
            .map(|a| a.as_str().to_string())
            .ok_or_else(|| {
                RelayError::ConnectionFailed("upstream url has no authority".to_string())
            })?;

        http::Request::builder()
            .uri(&url)
            .header("Authorization", format!("Bearer {}", self.config.api_key))
            .header("OpenAI-Beta", "realtime=v1")
            .header(
                "Sec-WebSocket-Key",
                tungstenite::handshake::client::generate_key(),
            )
            .header("Sec-WebSocket-Version", "13")
            .header("Connection", "Upgrade")
            .header("Upgrade", "websocket")
            .header("Host", host)
            .body(())
            .map_err(|e| RelayError::ConnectionFailed(e.to_string()))
    }

    fn map_connect_error(err: tungstenite::Error) -> RelayError {
        match err {
            tungstenite::Error::Http(resp)
                if resp.status() == http::StatusCode::UNAUTHORIZED
                    || resp.status() == http::StatusCode::FORBIDDEN =>
            {
                RelayError::AuthenticationFailed(format!(
                    "upstream rejected credentials ({})",
                    resp.status()
                ))
            }
            other => RelayError::ConnectionFailed(other.to_string()),
        }
    }

    /// Queue a pre-serialized frame onto the socket writer.
    async fn send_raw(&self, json: String) -> RelayResult<()> {
        if let Some(sender) = self.ws_sender.lock().await.as_ref() {
            sender
                .send(json)
                .await
                .map_err(|e| RelayError::SendFailed(e.to_string()))
        } else {
            Err(RelayError::NotConnected)
        }
    }
}

#[async_trait]
impl UpstreamSession for OpenAiUpstream {
    async fn connect(&mut self) -> RelayResult<()> {
        if self.connected.load(Ordering::SeqCst) {
            return Ok(());
        }

        let request = self.build_request()?;
        let timeout = Duration::from_millis(self.config.connect_timeout_ms);

        let (ws_stream, _response) =
            tokio::time::timeout(timeout, tokio_tungstenite::connect_async(request))
                .await
                .map_err(|_| RelayError::Timeout(self.config.connect_timeout_ms))?
                .map_err(Self::map_connect_error)?;

        tracing::info!(model = %self.config.model, "Connected to OpenAI Realtime API");

        let (mut ws_sink, mut ws_stream) = ws_stream.split();

        let (tx, mut rx) = mpsc::channel::<String>(WS_CHANNEL_CAPACITY);
        *self.ws_sender.lock().await = Some(tx);

        let server_event_cb = self.server_event_callback.clone();
        let closed_cb = self.closed_callback.clone();
        let closed_fired = self.closed_fired.clone();
        let connected = self.connected.clone();
        let ws_sender = self.ws_sender.clone();

        self.connected.store(true, Ordering::SeqCst);

        let handle = tokio::spawn(async move {
            loop {
                tokio::select! {
                    // Outgoing client events
                    maybe_json = rx.recv() => {
                        let Some(json) = maybe_json else {
                            // Writer handle dropped during teardown
                            break;
                        };
                        if let Err(e) = ws_sink.send(Message::Text(json.into())).await {
                            tracing::error!("Failed to send upstream message: {}", e);
                            break;
                        }
                    }

                    // Incoming server events
                    maybe_msg = ws_stream.next() => {
                        let Some(msg) = maybe_msg else {
                            // Stream ended without a close frame
                            tracing::info!("Upstream stream ended");
                            break;
                        };
                        match msg {
                            Ok(Message::Text(text)) => {
                                match ServerEventFrame::parse(text.as_str()) {
                                    Ok(frame) => {
                                        tracing::debug!(
                                            event_type = %frame.event_type,
                                            "Relaying server event"
                                        );
                                        if let Some(cb) = server_event_cb.lock().await.as_ref() {
                                            cb(frame).await;
                                        }
                                    }
                                    Err(e) => {
                                        // Malformed server frame: drop it, keep the session
                                        tracing::warn!("Dropping malformed server event: {}", e);
                                    }
                                }
                            }
                            Ok(Message::Close(_)) => {
                                tracing::info!("Upstream session closed by server");
                                break;
                            }
                            Ok(Message::Ping(data)) => {
                                if let Err(e) = ws_sink.send(Message::Pong(data)).await {
                                    tracing::error!("Failed to send pong: {}", e);
                                }
                            }
                            Err(e) => {
                                tracing::error!("Upstream WebSocket error: {}", e);
                                break;
                            }
                            _ => {}
                        }
                    }
                }
            }

            connected.store(false, Ordering::SeqCst);
            *ws_sender.lock().await = None;

            if !closed_fired.swap(true, Ordering::SeqCst) {
                if let Some(cb) = closed_cb.lock().await.as_ref() {
                    cb().await;
                }
            }

            tracing::debug!("Upstream socket task ended");
        });

        *self.task_handle.lock().await = Some(handle);

        Ok(())
    }

    async fn disconnect(&mut self) -> RelayResult<()> {
        // Suppress the close notification: the owner initiated this teardown
        self.closed_fired.store(true, Ordering::SeqCst);
        self.connected.store(false, Ordering::SeqCst);

        *self.ws_sender.lock().await = None;

        if let Some(handle) = self.task_handle.lock().await.take() {
            handle.abort();
            tracing::info!("Disconnected from OpenAI Realtime API");
        }

        Ok(())
    }

    fn is_ready(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    async fn send_event(&mut self, frame: &ClientFrame) -> RelayResult<()> {
        if !self.is_ready() {
            return Err(RelayError::NotConnected);
        }

        self.send_raw(frame.to_json()?).await
    }

    async fn cancel_response(&mut self, offset: TrackOffset) -> RelayResult<()> {
        // Best-effort: a cancel that races a completed response, or a session
        // that is already gone, is a no-op rather than an error.
        if !self.is_ready() {
            tracing::debug!("Cancel requested on inactive session, ignoring");
            return Ok(());
        }

        for event in ClientEvent::cancellation(&offset) {
            let frame = event.into_frame()?;
            if let Err(e) = self.send_raw(frame.to_json()?).await {
                tracing::debug!("Cancel request not delivered: {}", e);
                return Ok(());
            }
        }

        Ok(())
    }

    fn on_server_event(&mut self, callback: ServerEventCallback) {
        // try_lock registers synchronously in the common case, so no event
        // can be dispatched before the handler is in place
        if let Ok(mut guard) = self.server_event_callback.try_lock() {
            *guard = Some(callback);
        } else {
            let cb = self.server_event_callback.clone();
            tokio::spawn(async move {
                *cb.lock().await = Some(callback);
            });
        }
    }

    fn on_closed(&mut self, callback: ClosedCallback) {
        if let Ok(mut guard) = self.closed_callback.try_lock() {
            *guard = Some(callback);
        } else {
            let cb = self.closed_callback.clone();
            tokio::spawn(async move {
                *cb.lock().await = Some(callback);
            });
        }
    }
}
