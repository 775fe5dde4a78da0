//! Wire codec for mesh frames
//!
//! Transports carry opaque bytes; this module turns a [`MeshMessage`] into a
//! checksummed frame and back. Frames that fail to decode are never handed
//! to the relay engine.
//!
//! [`MeshMessage`]: crate::mesh::MeshMessage

pub mod error;
pub mod frame;

pub use error::{CodecError, CodecResult};
pub use frame::{decode_frame, encode_frame, MAX_BODY_LEN};
