//! Relay coordinator: one downstream connection wired to one upstream
//! session.
//!
//! The coordinator is an explicit state machine,
//!
//! ```text
//! Init -> Connecting -> Active -> Closed
//!                   \-> Closed
//! ```
//!
//! driven by a single per-session event stream, so all session state is
//! owned by one task and no locking is needed across sessions. Downstream
//! frames that arrive while the upstream connect is in flight land in the
//! pending queue; the `Connecting -> Active` transition drains the queue in
//! arrival order and only then marks the session ready, as one atomic step.
//! Closing either side closes the other exactly once.

use tokio::sync::mpsc;

use crate::core::relay::queue::PendingQueue;
use crate::core::upstream::{ClientFrame, TrackOffset, UpstreamSession};
use crate::errors::RelayResult;

/// Relay session lifecycle states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SessionState {
    /// Accepted, upstream connect not yet started
    #[default]
    Init,
    /// Upstream connect in flight; downstream frames queue
    Connecting,
    /// Upstream ready; frames relay directly
    Active,
    /// Terminal; late events are dropped
    Closed,
}

/// Events feeding one relay session, in arrival order.
#[derive(Debug)]
pub enum SessionEvent {
    /// A parsed client event from the downstream connection
    Frame(ClientFrame),
    /// Downstream reported a playback interruption
    Interrupt(TrackOffset),
    /// The downstream connection closed
    DownstreamClosed,
    /// The upstream session closed
    UpstreamClosed,
}

enum ConnectOutcome {
    Connected,
    Failed(crate::errors::RelayError),
    DownstreamGone,
}

/// One relayed session: exactly one downstream connection, exactly one
/// upstream session, one pending queue, one state field.
pub struct RelaySession<U> {
    id: String,
    state: SessionState,
    queue: PendingQueue,
    upstream: U,
}

impl<U: UpstreamSession> RelaySession<U> {
    /// Create a session in `Init` around a not-yet-connected upstream.
    pub fn new(id: impl Into<String>, upstream: U) -> Self {
        Self {
            id: id.into(),
            state: SessionState::Init,
            queue: PendingQueue::new(),
            upstream,
        }
    }

    /// Session identifier used for log correlation.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Current lifecycle state.
    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Drive the session to completion.
    ///
    /// Starts the upstream connect immediately, absorbs downstream frames
    /// into the pending queue until the connect resolves, drains the queue,
    /// then relays until either side closes. Returns when the session is
    /// `Closed`; an `Err` means the session died of a connect or send
    /// failure (the caller closes the downstream connection either way).
    pub async fn run(&mut self, events: &mut mpsc::Receiver<SessionEvent>) -> RelayResult<()> {
        // INIT -> CONNECTING
        self.state = SessionState::Connecting;
        tracing::debug!(session_id = %self.id, "Connecting upstream session");

        let outcome = {
            let connect_fut = self.upstream.connect();
            tokio::pin!(connect_fut);
            loop {
                tokio::select! {
                    res = &mut connect_fut => {
                        break match res {
                            Ok(()) => ConnectOutcome::Connected,
                            Err(e) => ConnectOutcome::Failed(e),
                        };
                    }
                    maybe = events.recv() => match maybe {
                        Some(SessionEvent::Frame(frame)) => {
                            tracing::debug!(
                                session_id = %self.id,
                                event_type = %frame.event_type,
                                queued = self.queue.len() + 1,
                                "Queueing client event until upstream is ready"
                            );
                            self.queue.push(frame);
                        }
                        Some(SessionEvent::Interrupt(_)) => {
                            // Nothing is in flight before readiness
                            tracing::debug!(session_id = %self.id, "Ignoring interrupt before ready");
                        }
                        Some(SessionEvent::DownstreamClosed) | None => {
                            break ConnectOutcome::DownstreamGone;
                        }
                        Some(SessionEvent::UpstreamClosed) => {
                            // Cannot fire before connect resolves; drop it
                        }
                    }
                }
            }
        };

        match outcome {
            ConnectOutcome::Failed(e) => {
                // CONNECTING -> CLOSED: discard the queue, nothing was sent
                tracing::warn!(session_id = %self.id, error = %e, "Upstream connect failed");
                self.queue.clear();
                self.state = SessionState::Closed;
                return Err(e);
            }
            ConnectOutcome::DownstreamGone => {
                tracing::info!(session_id = %self.id, "Downstream closed during connect");
                self.queue.clear();
                self.close_both().await;
                return Ok(());
            }
            ConnectOutcome::Connected => {}
        }

        // CONNECTING -> ACTIVE: drain, then ready, as one step
        let pending = self.queue.take_all();
        let drained = pending.len();
        for frame in pending {
            if let Err(e) = self.upstream.send_event(&frame).await {
                tracing::warn!(session_id = %self.id, error = %e, "Send failed during queue drain");
                self.close_both().await;
                return Err(e);
            }
        }
        self.state = SessionState::Active;
        tracing::info!(session_id = %self.id, drained, "Relay session active");

        // ACTIVE: relay until either side closes
        while let Some(event) = events.recv().await {
            match event {
                SessionEvent::Frame(frame) => {
                    tracing::debug!(
                        session_id = %self.id,
                        event_type = %frame.event_type,
                        "Relaying client event upstream"
                    );
                    if let Err(e) = self.upstream.send_event(&frame).await {
                        tracing::warn!(session_id = %self.id, error = %e, "Upstream send failed");
                        self.close_both().await;
                        return Err(e);
                    }
                }
                SessionEvent::Interrupt(offset) => {
                    // Fire-and-forget; a cancel racing a completed response
                    // is a no-op and never tears the session down
                    tracing::debug!(
                        session_id = %self.id,
                        item_id = %offset.item_id,
                        sample_offset = offset.sample_offset,
                        "Cancelling interrupted response"
                    );
                    if let Err(e) = self.upstream.cancel_response(offset).await {
                        tracing::debug!(session_id = %self.id, error = %e, "Cancel not delivered");
                    }
                }
                SessionEvent::DownstreamClosed => {
                    tracing::info!(session_id = %self.id, "Downstream connection closed");
                    self.close_both().await;
                    return Ok(());
                }
                SessionEvent::UpstreamClosed => {
                    tracing::info!(session_id = %self.id, "Upstream session closed");
                    self.close_both().await;
                    return Ok(());
                }
            }
        }

        // Event source dropped: downstream side is gone
        self.close_both().await;
        Ok(())
    }

    /// Tear both sides down together. Idempotent: the state guard makes the
    /// upstream disconnect happen exactly once per session.
    async fn close_both(&mut self) {
        if self.state == SessionState::Closed {
            return;
        }
        self.state = SessionState::Closed;
        if let Err(e) = self.upstream.disconnect().await {
            tracing::warn!(session_id = %self.id, error = %e, "Upstream disconnect failed");
        }
    }
}
