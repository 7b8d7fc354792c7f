//! Fan-out progress notifications.
//!
//! The pipeline mirrors every state transition as a human-readable message.
//! Delivery is best-effort: publishing never waits for observers, and a slow
//! observer loses the oldest messages instead of applying back-pressure.

use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::trace;

/// Fire-and-forget sink for progress messages.
///
/// Messages may contain newlines; subscribers are free to split them into
/// separate display lines.
pub trait Broadcaster: Send + Sync {
    fn publish(&self, message: &str);
}

/// A [`Broadcaster`] backed by a `tokio::sync::broadcast` channel.
///
/// Any number of observers may [`subscribe`](ChannelBroadcaster::subscribe).
#[derive(Clone)]
pub struct ChannelBroadcaster {
    sender: broadcast::Sender<Arc<str>>,
}

impl ChannelBroadcaster {
    /// Create a broadcaster retaining up to `capacity` undelivered messages per observer.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    /// Subscribe to all messages published from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<Arc<str>> {
        self.sender.subscribe()
    }

    /// Number of current observers.
    pub fn observer_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for ChannelBroadcaster {
    fn default() -> Self {
        Self::new(256)
    }
}

impl Broadcaster for ChannelBroadcaster {
    fn publish(&self, message: &str) {
        trace!(content = message, "broadcast");
        // No observers is fine
        let _ = self.sender.send(Arc::from(message));
    }
}

/// Drops every message. Useful when nobody is watching.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullBroadcaster;

impl Broadcaster for NullBroadcaster {
    fn publish(&self, _message: &str) {}
}
