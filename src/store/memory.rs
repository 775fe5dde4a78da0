//! In-memory local store

use crate::mesh::{MeshMessage, NodeIdentity, HISTORY_LIMIT};
use crate::store::log::MessageLog;
use crate::store::LocalStore;
use async_trait::async_trait;
use parking_lot::RwLock;

/// Volatile store, used for tests and memory-only sessions
pub struct MemoryStore {
    limit: usize,
    inner: RwLock<MemoryInner>,
}

#[derive(Default)]
struct MemoryInner {
    identity: Option<NodeIdentity>,
    log: MessageLog,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::with_limit(HISTORY_LIMIT)
    }

    pub fn with_limit(limit: usize) -> Self {
        Self {
            limit,
            inner: RwLock::new(MemoryInner::default()),
        }
    }

    /// Number of stored messages across all channels
    pub fn len(&self) -> usize {
        self.inner.read().log.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.read().log.is_empty()
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl LocalStore for MemoryStore {
    async fn load_history(&self, channel_id: &str) -> Vec<MeshMessage> {
        self.inner.read().log.channel(channel_id)
    }

    async fn append_message(&self, message: &MeshMessage) {
        let limit = self.limit;
        self.inner.write().log.push(message.clone(), limit);
    }

    async fn load_identity(&self) -> Option<NodeIdentity> {
        self.inner.read().identity.clone()
    }

    async fn save_identity(&self, identity: &NodeIdentity) {
        self.inner.write().identity = Some(identity.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mesh::{MessageType, GLOBAL_CHANNEL, MAX_TTL};

    #[tokio::test]
    async fn test_identity_roundtrip() {
        let store = MemoryStore::new();
        assert!(store.load_identity().await.is_none());

        let identity = NodeIdentity::new("FM-AAA111", "Asha");
        store.save_identity(&identity).await;
        assert_eq!(store.load_identity().await, Some(identity));
    }

    #[tokio::test]
    async fn test_bounded_history() {
        let store = MemoryStore::new();
        let identity = NodeIdentity::new("FM-AAA111", "Asha");

        let mut ids = Vec::new();
        for n in 0..250 {
            let msg = MeshMessage::originate(&identity, format!("msg {}", n), MessageType::Text, GLOBAL_CHANNEL, MAX_TTL);
            ids.push(msg.id.clone());
            store.append_message(&msg).await;
        }

        assert_eq!(store.len(), 200);
        let history = store.load_history(GLOBAL_CHANNEL).await;
        let kept: Vec<String> = history.into_iter().map(|m| m.id).collect();
        for id in &ids[..50] {
            assert!(!kept.contains(id));
        }
        for id in &ids[50..] {
            assert!(kept.contains(id));
        }
    }

    #[tokio::test]
    async fn test_append_is_idempotent() {
        let store = MemoryStore::new();
        let identity = NodeIdentity::new("FM-AAA111", "Asha");
        let msg = MeshMessage::originate(&identity, "hi", MessageType::Text, GLOBAL_CHANNEL, MAX_TTL);

        store.append_message(&msg).await;
        store.append_message(&msg).await;
        assert_eq!(store.len(), 1);
    }
}
