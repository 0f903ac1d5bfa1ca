use common::event::NotificationEvent;
use tokio::sync::broadcast;

const CHANNEL_CAPACITY: usize = 64;

/// Fan-out point between the listener and subscribed host connections.
///
/// Publishing with no subscriber drops the event; there is no queueing
/// for late subscribers. With one attached, delivery is in arrival
/// order.
#[derive(Clone)]
pub struct EventRelay {
    sender: broadcast::Sender<NotificationEvent>,
}

impl EventRelay {
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(CHANNEL_CAPACITY);
        Self { sender }
    }

    pub fn publish(&self, event: NotificationEvent) {
        // The send error just means nobody is subscribed.
        let _ = self.sender.send(event);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<NotificationEvent> {
        self.sender.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for EventRelay {
    fn default() -> Self {
        Self::new()
    }
}
