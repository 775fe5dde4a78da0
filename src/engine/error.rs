use crate::mesh::MeshError;
use crate::transport::TransportError;
use thiserror::Error;

/// Result type for relay engine operations
pub type RelayResult<T> = Result<T, RelayError>;

#[derive(Debug, Error)]
pub enum RelayError {
    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    #[error("{0}")]
    Mesh(#[from] MeshError),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}
