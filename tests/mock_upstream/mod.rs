//! Mock Realtime API server
//!
//! Speaks just enough of the upstream WebSocket protocol to exercise the
//! relay end to end: it records every client event it receives, sends a
//! `session.created` greeting on connect, and answers pings.

use futures_util::{SinkExt, StreamExt};
use serde_json::{Value, json};
use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::net::TcpListener;
use tokio::sync::Mutex;
use tokio_tungstenite::{
    accept_hdr_async,
    tungstenite::{
        Message,
        handshake::server::{Request, Response},
    },
};

/// How a mock connection behaves after the handshake.
#[derive(Clone, Copy, Default)]
pub enum MockBehavior {
    /// Greet, then echo-record until the client closes
    #[default]
    Normal,
    /// Greet, then immediately close the connection
    CloseAfterGreeting,
    /// Greet, then drop the TCP stream without a close handshake
    DropAfterGreeting,
    /// Greet, then emit [`BURST_EVENT_TYPES`] back to back, then keep
    /// serving as `Normal`
    BurstAfterGreeting,
}

/// Event types the burst behavior emits, in exactly this order.
pub const BURST_EVENT_TYPES: [&str; 5] = [
    "response.created",
    "response.text.delta",
    "response.audio.delta",
    "response.output_item.done",
    "response.done",
];

pub struct MockUpstreamServer {
    pub addr: SocketAddr,
    /// Every client event received, in arrival order
    pub received: Arc<Mutex<Vec<Value>>>,
    /// Number of completed WebSocket handshakes
    pub connections: Arc<AtomicU64>,
    /// Authorization header from the most recent handshake
    pub auth_header: Arc<Mutex<Option<String>>>,
    /// Request path and query from the most recent handshake
    pub request_uri: Arc<Mutex<Option<String>>>,
}

impl MockUpstreamServer {
    pub async fn start() -> Self {
        Self::start_with(MockBehavior::Normal).await
    }

    pub async fn start_with(behavior: MockBehavior) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let server = Self {
            addr,
            received: Arc::new(Mutex::new(Vec::new())),
            connections: Arc::new(AtomicU64::new(0)),
            auth_header: Arc::new(Mutex::new(None)),
            request_uri: Arc::new(Mutex::new(None)),
        };

        let received = server.received.clone();
        let connections = server.connections.clone();
        let auth_header = server.auth_header.clone();
        let request_uri = server.request_uri.clone();

        tokio::spawn(async move {
            loop {
                let Ok((stream, _)) = listener.accept().await else {
                    break;
                };
                let received = received.clone();
                let connections = connections.clone();
                let auth_header = auth_header.clone();
                let request_uri = request_uri.clone();

                tokio::spawn(async move {
                    let header_capture = auth_header.clone();
                    let uri_capture = request_uri.clone();
                    let callback = move |request: &Request, response: Response| {
                        let auth = request
                            .headers()
                            .get("Authorization")
                            .and_then(|v| v.to_str().ok())
                            .map(|v| v.to_string());
                        let uri = request.uri().to_string();
                        // blocking_lock is unavailable inside the runtime;
                        // try_lock is fine since nothing else holds these
                        if let Ok(mut guard) = header_capture.try_lock() {
                            *guard = auth;
                        }
                        if let Ok(mut guard) = uri_capture.try_lock() {
                            *guard = Some(uri);
                        }
                        Ok(response)
                    };

                    let Ok(ws_stream) = accept_hdr_async(stream, callback).await else {
                        return;
                    };
                    connections.fetch_add(1, Ordering::SeqCst);

                    let (mut write, mut read) = ws_stream.split();

                    let greeting = json!({
                        "type": "session.created",
                        "session": {"id": "sess_mock"}
                    });
                    let _ = write
                        .send(Message::Text(greeting.to_string().into()))
                        .await;

                    match behavior {
                        MockBehavior::CloseAfterGreeting => {
                            let _ = write.send(Message::Close(None)).await;
                            return;
                        }
                        MockBehavior::DropAfterGreeting => {
                            // Dropping both halves sends a bare FIN
                            return;
                        }
                        MockBehavior::BurstAfterGreeting => {
                            for (seq, event_type) in BURST_EVENT_TYPES.iter().enumerate() {
                                let event = json!({"type": event_type, "seq": seq});
                                let _ = write
                                    .send(Message::Text(event.to_string().into()))
                                    .await;
                            }
                        }
                        MockBehavior::Normal => {}
                    }

                    while let Some(msg) = read.next().await {
                        match msg {
                            Ok(Message::Text(text)) => {
                                if let Ok(value) = serde_json::from_str::<Value>(&text) {
                                    received.lock().await.push(value);
                                }
                            }
                            Ok(Message::Ping(data)) => {
                                let _ = write.send(Message::Pong(data)).await;
                            }
                            Ok(Message::Close(_)) => break,
                            Err(_) => break,
                            _ => {}
                        }
                    }
                });
            }
        });

        server
    }

    pub fn url(&self) -> String {
        format!("ws://{}", self.addr)
    }

    /// Event type discriminants of everything received so far.
    pub async fn received_types(&self) -> Vec<String> {
        self.received
            .lock()
            .await
            .iter()
            .map(|v| {
                v.get("type")
                    .and_then(|t| t.as_str())
                    .unwrap_or("")
                    .to_string()
            })
            .collect()
    }
}

/// Bind a TCP listener that accepts connections but never completes the
/// WebSocket handshake.
pub async fn bind_silent() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        loop {
            let Ok((stream, _)) = listener.accept().await else {
                break;
            };
            // Hold the socket open without answering
            tokio::spawn(async move {
                let _stream = stream;
                tokio::time::sleep(std::time::Duration::from_secs(60)).await;
            });
        }
    });
    addr
}

/// An address nothing is listening on.
pub async fn unused_addr() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    addr
}
