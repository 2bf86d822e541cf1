//! Call event fan-out

use crate::domain::call::CallEvent;
use crate::domain::shared::events::DomainEvent;
use tokio::sync::broadcast;
use tracing::trace;

/// Fans call events out to any number of observers
#[derive(Clone)]
pub struct CallEventBroadcaster {
    tx: broadcast::Sender<CallEvent>,
}

impl CallEventBroadcaster {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    pub fn publish(&self, event: CallEvent) {
        trace!("Publishing {} event", event.event_type());
        // Ignore send errors (no receivers)
        let _ = self.tx.send(event);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<CallEvent> {
        self.tx.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for CallEventBroadcaster {
    fn default() -> Self {
        Self::new(1000)
    }
}
