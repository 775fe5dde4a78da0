use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MeshError {
    #[error("Missing required field: {0}")]
    MissingField(&'static str),

    #[error("Hop count out of range: {0}")]
    HopsOutOfRange(u32),

    #[error("Invalid nickname: {0:?}")]
    InvalidNickname(String),

    #[error("Invalid payload: {0}")]
    InvalidPayload(String),
}

pub type MeshResult<T> = Result<T, MeshError>;
