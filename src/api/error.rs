use crate::engine::RelayError;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Relay error: {0}")]
    RelayError(#[from] RelayError),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_message, error_code) = match self {
            ApiError::RelayError(RelayError::Mesh(e)) => {
                (StatusCode::BAD_REQUEST, e.to_string(), "INVALID_INPUT")
            }
            ApiError::RelayError(e) => {
                (StatusCode::INTERNAL_SERVER_ERROR, e.to_string(), "RELAY_ERROR")
            }
            ApiError::InvalidRequest(e) => {
                (StatusCode::BAD_REQUEST, e, "INVALID_REQUEST")
            }
        };

        let body = Json(json!({
            "error": error_message,
            "code": error_code,
        }));

        (status, body).into_response()
    }
}

pub type ApiResult<T> = Result<T, ApiError>;
