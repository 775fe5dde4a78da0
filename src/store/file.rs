//! File-backed local store
//!
//! Keeps the two flat records of an installation as JSON files in one
//! directory: `identity.json` and `messages.json`. Writes go through a
//! temporary file and a rename so a crash never leaves a half-written record.

use crate::mesh::{MeshMessage, NodeIdentity, HISTORY_LIMIT};
use crate::store::error::{StoreError, StoreResult};
use crate::store::log::MessageLog;
use crate::store::LocalStore;
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;

const IDENTITY_FILE: &str = "identity.json";
const MESSAGES_FILE: &str = "messages.json";

pub struct FileStore {
    root: PathBuf,
    limit: usize,
    /// Serializes read-modify-write cycles on `messages.json`
    write_lock: Mutex<()>,
}

impl FileStore {
    /// Open (creating if needed) a store rooted at `root`
    pub async fn open(root: impl AsRef<Path>) -> StoreResult<Self> {
        let root = root.as_ref().to_path_buf();
        tokio::fs::create_dir_all(&root).await?;
        Ok(Self {
            root,
            limit: HISTORY_LIMIT,
            write_lock: Mutex::new(()),
        })
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = limit;
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    async fn read_json<T: DeserializeOwned>(&self, name: &str) -> StoreResult<Option<T>> {
        match tokio::fs::read(self.root.join(name)).await {
            Ok(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(StoreError::IoError(e)),
        }
    }

    async fn write_json<T: Serialize>(&self, name: &str, value: &T) -> StoreResult<()> {
        let path = self.root.join(name);
        let tmp = self.root.join(format!("{}.tmp", name));
        let data = serde_json::to_vec(value)?;
        tokio::fs::write(&tmp, data).await?;
        tokio::fs::rename(&tmp, &path).await?;
        Ok(())
    }

    async fn read_log(&self) -> MessageLog {
        match self.read_json::<MessageLog>(MESSAGES_FILE).await {
            Ok(log) => log.unwrap_or_default(),
            Err(e) => {
                tracing::warn!("Message log in {} unreadable, starting empty: {}", self.root.display(), e);
                MessageLog::default()
            }
        }
    }

    async fn try_append(&self, message: &MeshMessage) -> StoreResult<()> {
        let _guard = self.write_lock.lock().await;
        let mut log = self.read_log().await;
        if log.push(message.clone(), self.limit) {
            self.write_json(MESSAGES_FILE, &log).await?;
        }
        Ok(())
    }
}

#[async_trait]
impl LocalStore for FileStore {
    async fn load_history(&self, channel_id: &str) -> Vec<MeshMessage> {
        self.read_log().await.channel(channel_id)
    }

    async fn append_message(&self, message: &MeshMessage) {
        if let Err(e) = self.try_append(message).await {
            tracing::warn!("Failed to persist message {}: {}", message.id, e);
        }
    }

    async fn load_identity(&self) -> Option<NodeIdentity> {
        match self.read_json::<NodeIdentity>(IDENTITY_FILE).await {
            Ok(identity) => identity,
            Err(e) => {
                tracing::warn!("Identity record unreadable: {}", e);
                None
            }
        }
    }

    async fn save_identity(&self, identity: &NodeIdentity) {
        if let Err(e) = self.write_json(IDENTITY_FILE, identity).await {
            tracing::warn!("Failed to persist identity {}: {}", identity.node_id, e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mesh::{MessageType, GLOBAL_CHANNEL, MAX_TTL};
    use tempfile::TempDir;

    fn identity() -> NodeIdentity {
        NodeIdentity::new("FM-AAA111", "Asha")
    }

    #[tokio::test]
    async fn test_persists_across_reopen() {
        let dir = TempDir::new().unwrap();

        {
            let store = FileStore::open(dir.path()).await.unwrap();
            store.save_identity(&identity()).await;
            let msg = MeshMessage::originate(&identity(), "boat needed", MessageType::Text, GLOBAL_CHANNEL, MAX_TTL);
            store.append_message(&msg).await;
        }

        let store = FileStore::open(dir.path()).await.unwrap();
        assert_eq!(store.load_identity().await, Some(identity()));

        let history = store.load_history(GLOBAL_CHANNEL).await;
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].payload, "boat needed");
    }

    #[tokio::test]
    async fn test_corrupt_records_fall_back_to_empty() {
        let dir = TempDir::new().unwrap();
        tokio::fs::write(dir.path().join(IDENTITY_FILE), b"{not json")
            .await
            .unwrap();
        tokio::fs::write(dir.path().join(MESSAGES_FILE), b"[{\"id\":")
            .await
            .unwrap();

        let store = FileStore::open(dir.path()).await.unwrap();
        assert!(store.load_identity().await.is_none());
        assert!(store.load_history(GLOBAL_CHANNEL).await.is_empty());

        // The next append replaces the corrupt log
        let msg = MeshMessage::originate(&identity(), "still here", MessageType::Text, GLOBAL_CHANNEL, MAX_TTL);
        store.append_message(&msg).await;
        assert_eq!(store.load_history(GLOBAL_CHANNEL).await.len(), 1);
    }

    #[tokio::test]
    async fn test_limit_applies_on_disk() {
        let dir = TempDir::new().unwrap();
        let store = FileStore::open(dir.path()).await.unwrap().with_limit(5);

        for n in 0..8 {
            let msg = MeshMessage::originate(&identity(), format!("msg {}", n), MessageType::Text, GLOBAL_CHANNEL, MAX_TTL);
            store.append_message(&msg).await;
        }

        let history = store.load_history(GLOBAL_CHANNEL).await;
        assert_eq!(history.len(), 5);
        assert!(history.iter().all(|m| m.payload != "msg 0"));
    }
}
