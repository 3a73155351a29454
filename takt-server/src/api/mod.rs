//! HTTP surface
//!
//! Handlers plus the boundary translation from domain errors to HTTP
//! responses. Business-rule failures surface their specific message;
//! storage faults surface a generic message without internal detail.

mod handlers;
mod sse;

pub use handlers::*;
pub use sse::*;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use takt_common::Error;
use tracing::error;

/// Error body returned for all failed requests
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

/// Boundary wrapper so handlers can use `?` on domain results
pub struct ApiError(pub Error);

impl From<Error> for ApiError {
    fn from(err: Error) -> Self {
        ApiError(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match &self.0 {
            Error::Validation(_) => (StatusCode::BAD_REQUEST, self.0.to_string()),
            Error::NotFound(_) => (StatusCode::NOT_FOUND, self.0.to_string()),
            Error::Forbidden(_) => (StatusCode::FORBIDDEN, self.0.to_string()),
            Error::DuplicateOpen { .. }
            | Error::AlreadyClosed(_)
            | Error::AlreadyCancelled(_)
            | Error::Conflict(_) => (StatusCode::CONFLICT, self.0.to_string()),
            Error::Database(_) | Error::Io(_) | Error::Config(_) | Error::Internal(_) => {
                error!("Internal error serving request: {}", self.0);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal server error".to_string(),
                )
            }
        };

        (status, Json(ErrorResponse { error: message })).into_response()
    }
}
