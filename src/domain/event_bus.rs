//! Broadcast channel for scrape events.
//!
//! [`EventBus`] wraps a [`tokio::sync::broadcast`] channel. Every run
//! transition publishes a [`ScrapeEvent`]; the notifier and any other
//! listener subscribe to receive them.

use tokio::sync::broadcast;

use super::ScrapeEvent;

/// Broadcast bus for [`ScrapeEvent`]s.
///
/// When the ring buffer is full, the oldest events are dropped for lagging
/// receivers.
#[derive(Debug, Clone)]
pub struct EventBus {
    sender: broadcast::Sender<ScrapeEvent>,
}

impl EventBus {
    /// Creates a new `EventBus` with the given channel capacity.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    /// Publishes an event to all subscribers.
    ///
    /// Returns the number of receivers that received the event. If there
    /// are no active receivers, the event is silently dropped.
    pub fn publish(&self, event: ScrapeEvent) -> usize {
        self.sender.send(event).unwrap_or(0)
    }

    /// Creates a new receiver that will receive all future events.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<ScrapeEvent> {
        self.sender.subscribe()
    }

    /// Returns the current number of active receivers.
    #[must_use]
    pub fn receiver_count(&self) -> usize {
        self.sender.receiver_count()
    }
}
