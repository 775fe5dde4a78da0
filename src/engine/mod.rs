//! Mesh relay engine
//!
//! Identity management, origination, flood-fill relay with TTL decay,
//! id-based dedup and the peer table, on top of an injected transport and
//! local store.

pub mod error;
pub mod identity;
pub mod peers;
pub mod relay;
pub mod seen;
pub mod types;

pub use error::{RelayError, RelayResult};
pub use identity::IdentityManager;
pub use peers::{PeerInfo, PeerTable};
pub use relay::{MeshRelay, MeshRelayBuilder, ReceiveOutcome};
pub use seen::SeenSet;
pub use types::{
    MeshConfig, MeshStatus, MessageCallback, RelayStats, DEFAULT_PEER_TIMEOUT,
    DEFAULT_SEEN_CAPACITY,
};
