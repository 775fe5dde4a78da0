//! Frame layout
//!
//! ```text
//! +--------+---------+-------------+--------------+-----------+
//! | "FMSH" | version | body length | blake3[0..8] | JSON body |
//! | 4 B    | 1 B     | 4 B (BE)    | 8 B          | n B       |
//! +--------+---------+-------------+--------------+-----------+
//! ```

use crate::codec::error::{CodecError, CodecResult};
use crate::mesh::MeshMessage;
use bytes::{BufMut, Bytes, BytesMut};

pub const FRAME_MAGIC: &[u8; 4] = b"FMSH";
pub const FRAME_VERSION: u8 = 1;
pub const CHECKSUM_LEN: usize = 8;
pub const HEADER_LEN: usize = FRAME_MAGIC.len() + 1 + 4 + CHECKSUM_LEN;

/// Largest body accepted on the wire
pub const MAX_BODY_LEN: usize = 64 * 1024;

/// Truncated BLAKE3 digest of a frame body
pub fn checksum(body: &[u8]) -> [u8; CHECKSUM_LEN] {
    let digest = blake3::hash(body);
    let mut out = [0u8; CHECKSUM_LEN];
    out.copy_from_slice(&digest.as_bytes()[..CHECKSUM_LEN]);
    out
}

/// Encode a message into a self-delimiting frame
pub fn encode_frame(message: &MeshMessage) -> CodecResult<Bytes> {
    let body = serde_json::to_vec(message)?;
    if body.len() > MAX_BODY_LEN {
        return Err(CodecError::FrameTooLarge(body.len()));
    }

    let mut buf = BytesMut::with_capacity(HEADER_LEN + body.len());
    buf.put_slice(FRAME_MAGIC);
    buf.put_u8(FRAME_VERSION);
    buf.put_u32(body.len() as u32);
    buf.put_slice(&checksum(&body));
    buf.put_slice(&body);

    Ok(buf.freeze())
}

/// Decode and validate a frame
pub fn decode_frame(frame: &[u8]) -> CodecResult<MeshMessage> {
    if frame.len() < HEADER_LEN {
        return Err(CodecError::Truncated(frame.len()));
    }
    if &frame[..4] != FRAME_MAGIC {
        return Err(CodecError::BadMagic);
    }
    if frame[4] != FRAME_VERSION {
        return Err(CodecError::UnsupportedVersion(frame[4]));
    }

    let mut len_bytes = [0u8; 4];
    len_bytes.copy_from_slice(&frame[5..9]);
    let body_len = u32::from_be_bytes(len_bytes) as usize;
    if body_len > MAX_BODY_LEN {
        return Err(CodecError::FrameTooLarge(body_len));
    }
    if frame.len() != HEADER_LEN + body_len {
        return Err(CodecError::LengthMismatch {
            expected: HEADER_LEN + body_len,
            actual: frame.len(),
        });
    }

    let body = &frame[HEADER_LEN..];
    if checksum(body) != frame[9..HEADER_LEN] {
        return Err(CodecError::ChecksumMismatch);
    }

    let message: MeshMessage = serde_json::from_slice(body)?;
    message.validate()?;
    Ok(message)
}
