//! In-process fan-out of pipeline notifications to WebSocket clients.
//!
//! Recorded events, badge refreshes and scheduler run summaries are pushed
//! here after they happen; nothing is persisted through the bus. A client
//! that reads slower than the scheduler writes loses the oldest
//! notifications and sees `RecvError::Lagged`; the event store remains the
//! source of truth.

use tokio::sync::broadcast;

use super::Notification;

/// Cloneable handle to the notification channel.
///
/// Publishing never blocks the scheduler and never fails: with nobody
/// connected the notification is discarded.
#[derive(Debug, Clone)]
pub struct EventBus {
    sender: broadcast::Sender<Notification>,
}

impl EventBus {
    /// Buffers up to `capacity` notifications per lagging client
    /// (`EVENT_BUS_CAPACITY`). Zero is raised to one.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    /// Fans `notification` out to every connected client and returns how
    /// many received it.
    pub fn publish(&self, notification: Notification) -> usize {
        self.sender.send(notification).unwrap_or(0)
    }

    /// Receiver for one WebSocket connection. Route filtering happens on
    /// the connection, not here.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<Notification> {
        self.sender.subscribe()
    }

    /// Number of live WebSocket receivers.
    #[must_use]
    pub fn receiver_count(&self) -> usize {
        self.sender.receiver_count()
    }
}
