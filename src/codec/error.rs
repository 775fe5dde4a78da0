use crate::mesh::MeshError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CodecError {
    #[error("Frame truncated: {0} bytes")]
    Truncated(usize),

    #[error("Bad frame magic")]
    BadMagic,

    #[error("Unsupported frame version: {0}")]
    UnsupportedVersion(u8),

    #[error("Frame body too large: {0} bytes")]
    FrameTooLarge(usize),

    #[error("Frame length mismatch: expected {expected}, got {actual}")]
    LengthMismatch { expected: usize, actual: usize },

    #[error("Frame checksum mismatch")]
    ChecksumMismatch,

    #[error("Serialization error: {0}")]
    SerializationError(String),

    #[error("Invalid message: {0}")]
    InvalidMessage(#[from] MeshError),
}

impl From<serde_json::Error> for CodecError {
    fn from(err: serde_json::Error) -> Self {
        CodecError::SerializationError(err.to_string())
    }
}

pub type CodecResult<T> = Result<T, CodecError>;
