//! Local store adapters
//!
//! Durable persistence of the node identity and the bounded message history.
//! Every method is infallible at this boundary: an unreadable or unavailable
//! backend degrades to an empty result so the relay keeps running in
//! memory-only mode.

pub mod error;
pub mod file;
pub mod log;
pub mod memory;
pub mod sqlite;

pub use error::{StoreError, StoreResult};
pub use file::FileStore;
pub use log::MessageLog;
pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

use crate::mesh::{MeshMessage, NodeIdentity};
use async_trait::async_trait;

#[async_trait]
pub trait LocalStore: Send + Sync {
    /// Stored messages of a channel, oldest timestamp first
    async fn load_history(&self, channel_id: &str) -> Vec<MeshMessage>;

    /// Append to the bounded history; a known id is ignored
    async fn append_message(&self, message: &MeshMessage);

    async fn load_identity(&self) -> Option<NodeIdentity>;

    async fn save_identity(&self, identity: &NodeIdentity);
}
