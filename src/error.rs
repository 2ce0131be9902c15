//! API error taxonomy for the RSVP server.
//!
//! Every failure a handler can produce maps onto one HTTP status and is
//! rendered with the uniform `{"error": "..."}` JSON envelope, matching the
//! success-path `Content-Type` and CORS treatment.
//!
//! # Status Mapping
//!
//! | Variant | Status |
//! |---|---|
//! | `Unauthorized` | 401 |
//! | `Forbidden` | 403 |
//! | `NotFound` | 404 |
//! | `MethodNotAllowed` | 405 |
//! | `Conflict` | 409 |
//! | `Internal` | 500 (message exposed in the body) |

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, error};

use crate::store::StoreError;

/// Errors returned by API handlers.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ApiError {
    /// The request carried no recognized bearer credential.
    #[error("{0}")]
    Unauthorized(String),

    /// The credential was valid but the role is insufficient.
    #[error("Admin only")]
    Forbidden,

    /// Unknown path or unknown record identifier.
    #[error("{0}")]
    NotFound(String),

    /// Matched path, unsupported method.
    #[error("Method not allowed")]
    MethodNotAllowed,

    /// A uniqueness constraint was violated.
    #[error("{0}")]
    Conflict(String),

    /// Store access or body parsing failed. The message is exposed in the
    /// response body.
    #[error("{0}")]
    Internal(String),
}

impl ApiError {
    /// Creates an unauthorized error with the standard message.
    pub fn unauthorized() -> Self {
        Self::Unauthorized("Unauthorized".to_string())
    }

    /// Creates a not-found error for an unmatched path.
    pub fn not_found() -> Self {
        Self::NotFound("Not found".to_string())
    }

    /// Returns the HTTP status code for this error.
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::Forbidden => StatusCode::FORBIDDEN,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
            Self::Conflict(_) => StatusCode::CONFLICT,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        Self::Internal(err.to_string())
    }
}

impl From<serde_json::Error> for ApiError {
    fn from(err: serde_json::Error) -> Self {
        Self::Internal(err.to_string())
    }
}

/// JSON error response body shared by all error statuses.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        if status.is_server_error() {
            error!(status = %status, error = %self, "Request failed");
        } else {
            debug!(status = %status, error = %self, "Request rejected");
        }

        (
            status,
            Json(ErrorResponse {
                error: self.to_string(),
            }),
        )
            .into_response()
    }
}
