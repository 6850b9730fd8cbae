//! Pending-send queue.
//!
//! Holds client events that arrive while the upstream session is still
//! connecting. Append-only and FIFO; the coordinator drains it exactly once
//! on the readiness transition and never consults it again.

use std::collections::VecDeque;

use crate::core::upstream::ClientFrame;

/// Ordered buffer of client events awaiting upstream readiness.
#[derive(Debug, Default)]
pub struct PendingQueue {
    frames: VecDeque<ClientFrame>,
}

impl PendingQueue {
    /// Create an empty queue.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a frame. O(1), never drops.
    pub fn push(&mut self, frame: ClientFrame) {
        self.frames.push_back(frame);
    }

    /// Take every queued frame in arrival order, leaving the queue empty.
    pub fn take_all(&mut self) -> Vec<ClientFrame> {
        self.frames.drain(..).collect()
    }

    /// Discard everything without sending.
    pub fn clear(&mut self) {
        self.frames.clear();
    }

    /// Number of queued frames.
    pub fn len(&self) -> usize {
        self.frames.len()
    }

    /// Whether the queue holds nothing.
    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }
}
