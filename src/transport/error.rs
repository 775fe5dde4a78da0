use crate::codec::CodecError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum TransportError {
    #[error("Bind failed on {addr}: {source}")]
    BindFailed {
        addr: std::net::SocketAddr,
        source: std::io::Error,
    },

    #[error("Unknown endpoint: {0}")]
    UnknownEndpoint(String),

    #[error("Codec error: {0}")]
    Codec(#[from] CodecError),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

pub type TransportResult<T> = Result<T, TransportError>;
