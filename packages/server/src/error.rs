//! Error types of the HTTP host.
//!
//! Handler-facing errors ([`AppError`]) render as [`ErrorResponse`] JSON with
//! the matching status code. Startup errors ([`MountError`], [`ServerError`])
//! are reported by the binary and never reach a client.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use apimount::RegistrationError;

use crate::config::ConfigError;

// ---------------------------------------------------------------------------
// ErrorResponse
// ---------------------------------------------------------------------------

/// The JSON body of every error response.
///
/// ```json
/// { "error": "no route for GET /nowhere", "code": "not_found" }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Human-readable description of the problem.
    pub error: String,

    /// Machine-readable error code.
    ///
    /// | `code` | HTTP status |
    /// |--------|------------|
    /// | `invalid_parameter` | 400 |
    /// | `unauthorized` | 401 |
    /// | `not_found` | 404 |
    /// | `validation_failed` | 422 |
    pub code: String,
}

impl ErrorResponse {
    pub fn new(code: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            code: code.into(),
        }
    }
}

// ---------------------------------------------------------------------------
// AppError
// ---------------------------------------------------------------------------

/// An error that a handler can return; converts directly to an HTTP response.
#[derive(Debug)]
pub enum AppError {
    NotFound(String),
    BadRequest(String),
    UnprocessableEntity(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = match self {
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, "not_found", msg),
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "invalid_parameter", msg),
            AppError::UnprocessableEntity(msg) => {
                (StatusCode::UNPROCESSABLE_ENTITY, "validation_failed", msg)
            }
        };
        (status, Json(ErrorResponse::new(code, message))).into_response()
    }
}

// ---------------------------------------------------------------------------
// Startup errors
// ---------------------------------------------------------------------------

/// The registry holds an endpoint the router cannot mount.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum MountError {
    #[error("endpoint {endpoint:?} has invalid pattern {pattern:?}: {reason}")]
    InvalidPattern {
        endpoint: String,
        pattern: String,
        reason: &'static str,
    },

    #[error("pattern {pattern:?} conflicts with {existing:?}: captures at one position must share a name")]
    ConflictingPattern { pattern: String, existing: String },

    #[error("route {verb} {pattern} is mounted twice")]
    DuplicateRoute { verb: String, pattern: String },
}

/// Anything that stops the server from starting or serving.
#[derive(Debug, Error)]
pub enum ServerError {
    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("api registration failed: {0}")]
    Registration(#[from] RegistrationError),

    #[error("cannot mount routes: {0}")]
    Mount(#[from] MountError),

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
}

#[cfg(test)]
mod tests {
    use http_body_util::BodyExt;

    use super::*;

    #[tokio::test]
    async fn app_error_renders_json_body() {
        let resp = AppError::NotFound("order 7 not found".into()).into_response();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);

        let bytes = resp.into_body().collect().await.unwrap().to_bytes();
        let body: ErrorResponse = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body, ErrorResponse::new("not_found", "order 7 not found"));
    }

    #[test]
    fn mount_error_messages() {
        let e = MountError::InvalidPattern {
            endpoint: "GET: list".into(),
            pattern: "orders".into(),
            reason: "must start with '/'",
        };
        assert_eq!(
            e.to_string(),
            "endpoint \"GET: list\" has invalid pattern \"orders\": must start with '/'"
        );

        let e = MountError::ConflictingPattern {
            pattern: "/orders/{order_id}".into(),
            existing: "/orders/{id}".into(),
        };
        assert_eq!(
            e.to_string(),
            "pattern \"/orders/{order_id}\" conflicts with \"/orders/{id}\": captures at one position must share a name"
        );
    }

    #[tokio::test]
    async fn validation_failure_renders_422() {
        let resp = AppError::UnprocessableEntity("quantity must be at least 1".into()).into_response();
        assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);

        let bytes = resp.into_body().collect().await.unwrap().to_bytes();
        let body: ErrorResponse = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body.code, "validation_failed");
    }
}
