//! Bounded FIFO buffer for not-yet-sent messages.
//!
//! Preserves outbound message order across disconnection windows without
//! unbounded memory growth. Back-pressure favors already-queued traffic:
//! when full, the NEW message is rejected, never an existing one.

use std::collections::VecDeque;

use einkauf_core::{ClientMessage, RealtimeError};

/// Ordered buffer of messages awaiting a live socket.
///
/// Not internally synchronized; the connection manager owns it inside its
/// state lock.
#[derive(Debug)]
pub struct OutboundQueue {
    items: VecDeque<ClientMessage>,
    capacity: usize,
}

impl OutboundQueue {
    /// Create an empty queue with the given capacity.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            items: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Append a message, rejecting it when the queue is at capacity.
    pub fn enqueue(&mut self, message: ClientMessage) -> Result<(), RealtimeError> {
        if self.items.len() >= self.capacity {
            return Err(RealtimeError::QueueFull {
                capacity: self.capacity,
            });
        }
        self.items.push_back(message);
        Ok(())
    }

    /// Remove and return the oldest message.
    pub fn pop_front(&mut self) -> Option<ClientMessage> {
        self.items.pop_front()
    }

    /// Put a message back at the front.
    ///
    /// Used when the socket becomes unavailable mid-drain: the in-flight
    /// message is requeued, not lost, and stays first in line.
    pub fn push_front(&mut self, message: ClientMessage) {
        self.items.push_front(message);
    }

    /// Discard all queued messages.
    pub fn clear(&mut self) {
        self.items.clear();
    }

    /// Number of queued messages.
    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Whether the queue holds no messages.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Configured capacity.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}
