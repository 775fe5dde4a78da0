//! Node identity resolution and renaming

use crate::mesh::{MeshError, MeshResult, NodeIdentity};
use crate::store::LocalStore;
use std::sync::Arc;
use tokio::sync::Mutex;

pub struct IdentityManager {
    store: Arc<dyn LocalStore>,
    /// Used instead of generating when nothing is persisted yet
    preset: Option<NodeIdentity>,
    cached: Mutex<Option<NodeIdentity>>,
}

impl IdentityManager {
    pub fn new(store: Arc<dyn LocalStore>) -> Self {
        Self {
            store,
            preset: None,
            cached: Mutex::new(None),
        }
    }

    pub fn with_preset(store: Arc<dyn LocalStore>, identity: NodeIdentity) -> Self {
        Self {
            store,
            preset: Some(identity),
            cached: Mutex::new(None),
        }
    }

    /// Persisted identity, or a new one that is persisted before returning
    pub async fn get_or_create(&self) -> NodeIdentity {
        let mut cached = self.cached.lock().await;
        if let Some(identity) = cached.as_ref() {
            return identity.clone();
        }

        let identity = match self.store.load_identity().await {
            Some(identity) => identity,
            None => {
                let identity = self.preset.clone().unwrap_or_else(NodeIdentity::generate);
                self.store.save_identity(&identity).await;
                tracing::info!("Created node identity {} ({})", identity.node_id, identity.nickname);
                identity
            }
        };

        *cached = Some(identity.clone());
        identity
    }

    /// Rename this node. Messages already sent keep the old name.
    pub async fn set_nickname(&self, name: &str) -> MeshResult<NodeIdentity> {
        let name = name.trim();
        if name.is_empty() {
            return Err(MeshError::InvalidNickname(name.to_string()));
        }

        let mut identity = self.get_or_create().await;
        identity.nickname = name.to_string();

        let mut cached = self.cached.lock().await;
        self.store.save_identity(&identity).await;
        *cached = Some(identity.clone());
        Ok(identity)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    #[tokio::test]
    async fn test_identity_created_once() {
        let store = Arc::new(MemoryStore::new());
        let manager = IdentityManager::new(store.clone());

        let first = manager.get_or_create().await;
        let second = manager.get_or_create().await;

        assert_eq!(first, second);
        assert!(first.node_id.starts_with("FM-"));
        assert_eq!(store.load_identity().await, Some(first));
    }

    #[tokio::test]
    async fn test_persisted_identity_wins() {
        let store = Arc::new(MemoryStore::new());
        let stored = NodeIdentity::new("FM-AAA111", "Asha");
        store.save_identity(&stored).await;

        let manager = IdentityManager::with_preset(store, NodeIdentity::new("FM-ZZZ999", "Zed"));
        assert_eq!(manager.get_or_create().await, stored);
    }

    #[tokio::test]
    async fn test_set_nickname() {
        let store = Arc::new(MemoryStore::new());
        let manager = IdentityManager::with_preset(store.clone(), NodeIdentity::new("FM-AAA111", "Asha"));

        let renamed = manager.set_nickname("  Rescue Team 4 ").await.unwrap();
        assert_eq!(renamed.node_id, "FM-AAA111");
        assert_eq!(renamed.nickname, "Rescue Team 4");
        assert_eq!(store.load_identity().await.unwrap().nickname, "Rescue Team 4");

        assert!(matches!(
            manager.set_nickname("   ").await,
            Err(MeshError::InvalidNickname(_))
        ));
        assert_eq!(manager.get_or_create().await.nickname, "Rescue Team 4");
    }
}
