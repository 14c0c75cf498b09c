//! Broadcast hub.
//!
//! Every live event goes through here. Subscribers get events in publish order
//! with a bounded per-subscriber buffer; a subscriber that falls behind loses
//! the oldest events and is told how many it missed, the others are never
//! held back. There is no replay: late joiners fetch snapshots over HTTP.

use sw_models::live::LiveEvent;
use tokio::sync::broadcast;
use tracing::trace;

#[derive(Debug, Clone)]
pub struct Hub {
    tx: broadcast::Sender<LiveEvent>,
}

impl Hub {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    /// Deliver `event` to everyone currently subscribed.
    pub fn publish(&self, event: LiveEvent) {
        trace!("Publishing {event}");
        if let Err(broadcast::error::SendError(event)) = self.tx.send(event) {
            trace!("No subscribers for {event}");
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<LiveEvent> {
        self.tx.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}
