//! In-process event bus
//!
//! A `tokio::sync::broadcast` channel of [`PresenceEvent`]s. Services publish
//! after every state change; the push gateway's dispatcher subscribes and
//! routes each event to the right connections.

use presence_core::PresenceEvent;
use tokio::sync::broadcast;

/// Cloneable handle to the bus
#[derive(Debug, Clone)]
pub struct EventBus {
    sender: broadcast::Sender<PresenceEvent>,
}

impl EventBus {
    /// Create a bus whose subscribers may lag by at most `capacity` events
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    /// Publish an event; returns how many subscribers will see it
    pub fn publish(&self, event: PresenceEvent) -> usize {
        let kind = event.kind();
        match self.sender.send(event) {
            Ok(receivers) => {
                tracing::trace!(event = kind, receivers, "Event published");
                receivers
            }
            Err(_) => {
                tracing::trace!(event = kind, "Event published with no subscribers");
                0
            }
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<PresenceEvent> {
        self.sender.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(1024)
    }
}
