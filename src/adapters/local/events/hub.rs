use crate::ports::ads::AdEvent;
use tokio::sync::broadcast;

/// Fan-out of ad lifecycle events to every subscriber.
#[derive(Debug)]
pub struct AdEventHub {
    sender: broadcast::Sender<AdEvent>,
}

impl Default for AdEventHub {
    fn default() -> Self {
        Self::new()
    }
}

impl AdEventHub {
    pub fn new() -> Self {
        // An ad produces at most three events per presentation
        let (sender, _) = broadcast::channel(16);
        Self { sender }
    }

    /// Returns the number of subscribers that received the event.
    pub fn publish(&self, event: AdEvent) -> usize {
        self.sender.send(event).unwrap_or(0)
    }

    pub fn subscribe(&self) -> broadcast::Receiver<AdEvent> {
        self.sender.subscribe()
    }
}
