//! In-process lifecycle event fan-out.

use tokio::sync::broadcast;

use taleweaver_domain::EvolutionEvent;

use crate::infrastructure::ports::{EvolutionEventPublisher, PublishError};

/// Publishes lifecycle events on a `tokio::sync::broadcast` channel.
///
/// Subscribers (e.g. a WebSocket broadcaster) call [`subscribe`](Self::subscribe);
/// events published while nobody listens are dropped.
pub struct BroadcastEventPublisher {
    sender: broadcast::Sender<EvolutionEvent>,
}

impl BroadcastEventPublisher {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<EvolutionEvent> {
        self.sender.subscribe()
    }
}

impl EvolutionEventPublisher for BroadcastEventPublisher {
    fn publish(&self, event: EvolutionEvent) -> Result<(), PublishError> {
        let name = event.name();
        self.sender
            .send(event)
            .map(|_| ())
            .map_err(|_| PublishError::NoSubscribers(name))
    }
}
