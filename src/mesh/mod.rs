//! Mesh message model
//!
//! Node identities, the message unit that floods through the mesh, and the
//! relay transformation applied when a node forwards a message.

pub mod error;
pub mod id;
pub mod types;

pub use error::{MeshError, MeshResult};
pub use types::{
    alert_payload, location_payload, sos_payload, MeshMessage, MessageType, NodeIdentity,
    PresencePayload, GLOBAL_CHANNEL, HISTORY_LIMIT, MAX_HOPS, MAX_TTL, PRESENCE_TTL,
};
