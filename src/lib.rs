//! FloodMesh - offline mesh messaging relay
//!
//! Store-and-forward, multi-hop message relay that lets people exchange
//! emergency messages without internet connectivity. Messages flood through
//! any broadcast medium with a hop budget, are deduplicated by id, never
//! loop back through a node that already carried them, and are kept in a
//! bounded local history.

pub mod api;
pub mod codec;
pub mod engine;
pub mod mesh;
pub mod metrics;
pub mod store;
pub mod transport;

pub use engine::{MeshConfig, MeshRelay, MeshRelayBuilder, MeshStatus, RelayError, RelayStats};
pub use mesh::{MeshMessage, MessageType, NodeIdentity};
pub use store::{FileStore, LocalStore, MemoryStore, SqliteStore};
pub use transport::{LocalBus, Transport, UdpBroadcastTransport};
