//! services/api/src/error.rs
//!
//! Defines the primary error type for the entire API service, and the error
//! type HTTP handlers return.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use smartstudy_core::ports::PortError;

use crate::config::ConfigError;

/// The primary error type for the `api` service.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Represents an error that occurred during configuration loading.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Represents an error that propagated up from one of the core service ports.
    #[error("Service Port Error: {0}")]
    Port(#[from] PortError),

    /// Represents a standard Input/Output error (e.g., binding to a network socket).
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// A catch-all for any other unexpected errors.
    #[error("An unexpected internal error occurred: {0}")]
    Internal(String),
}

//=========================================================================================
// HTTP Error Responses
//=========================================================================================

/// An error returned by a handler, rendered as `{ "error": message }`.
#[derive(Debug, Clone, PartialEq)]
pub struct HttpError {
    pub status: StatusCode,
    pub message: String,
}

impl HttpError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, message)
    }
}

impl From<PortError> for HttpError {
    fn from(err: PortError) -> Self {
        match err {
            PortError::NotFound(message) => Self::not_found(message),
            PortError::Validation(message) => Self::bad_request(message),
            PortError::Unauthorized(message) => Self::new(StatusCode::UNAUTHORIZED, message),
            PortError::Upstream(message) => Self::internal(message),
            PortError::Unexpected(_) => Self::internal("Something went wrong!"),
        }
    }
}

impl IntoResponse for HttpError {
    fn into_response(self) -> Response {
        (self.status, Json(json!({ "error": self.message }))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn port_errors_map_to_statuses() {
        let cases = [
            (PortError::NotFound("Quiz not found".into()), StatusCode::NOT_FOUND, "Quiz not found"),
            (PortError::Validation("Topic is required".into()), StatusCode::BAD_REQUEST, "Topic is required"),
            (PortError::Unauthorized("bad".into()), StatusCode::UNAUTHORIZED, "bad"),
            (PortError::Upstream("quota".into()), StatusCode::INTERNAL_SERVER_ERROR, "quota"),
            (PortError::Unexpected("lock".into()), StatusCode::INTERNAL_SERVER_ERROR, "Something went wrong!"),
        ];
        for (err, status, message) in cases {
            let http = HttpError::from(err);
            assert_eq!(http.status, status);
            assert_eq!(http.message, message);
        }
    }
}
