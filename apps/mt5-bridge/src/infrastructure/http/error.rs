//! HTTP Error Mapping
//!
//! Central error type for the HTTP surface. Faults that happen before a
//! stream begins are surfaced as rejected requests through this type;
//! faults after streaming began never pass through here - the session
//! driver turns them into in-band error events instead.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use thiserror::Error;

use crate::application::ports::TerminalError;

/// Request-level errors returned by the bridge endpoints.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Auth gate failure.
    #[error("unauthorized")]
    Unauthorized,

    /// Invalid request parameters.
    #[error("bad request: {0}")]
    BadRequest(String),

    /// Requested data does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// Terminal collaborator failure.
    #[error(transparent)]
    Terminal(#[from] TerminalError),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code, message) = match self {
            Self::Unauthorized => (
                StatusCode::UNAUTHORIZED,
                "UNAUTHORIZED",
                "unauthorized".to_string(),
            ),
            Self::BadRequest(msg) => (StatusCode::BAD_REQUEST, "BAD_REQUEST", msg),
            Self::NotFound(msg) => (StatusCode::NOT_FOUND, "NOT_FOUND", msg),
            Self::Terminal(e) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "TERMINAL_ERROR",
                e.to_string(),
            ),
        };

        let body = Json(json!({
            "error": code,
            "message": message,
        }));

        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_codes() {
        assert_eq!(
            ApiError::Unauthorized.into_response().status(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            ApiError::BadRequest("x".to_string()).into_response().status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ApiError::NotFound("x".to_string()).into_response().status(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            ApiError::Terminal(TerminalError::Request("x".to_string()))
                .into_response()
                .status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
