use crate::engine::MessageCallback;
use crate::mesh::MeshMessage;
use std::sync::Arc;
use tokio::sync::broadcast;

/// Fan-out of delivered messages to WebSocket clients
#[derive(Clone)]
pub struct MessageFeed {
    tx: broadcast::Sender<MeshMessage>,
}

impl MessageFeed {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    /// Relay callback that publishes into this feed
    pub fn callback(&self) -> MessageCallback {
        let tx = self.tx.clone();
        Arc::new(move |message: &MeshMessage| {
            // No subscribers is fine
            let _ = tx.send(message.clone());
        })
    }

    pub fn subscribe(&self) -> broadcast::Receiver<MeshMessage> {
        self.tx.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for MessageFeed {
    fn default() -> Self {
        Self::new(256)
    }
}
