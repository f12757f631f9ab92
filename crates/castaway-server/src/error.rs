//! Error types for the HTTP API.
//!
//! [`ApiError`] converts into an Axum response with a small JSON body of
//! the form `{"error": "...", "status": 404}`.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

/// Errors returned by the REST endpoints.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// The requested resource was not found.
    #[error("not found: {0}")]
    NotFound(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            Self::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
        };

        let body = serde_json::json!({
            "error": message,
            "status": status.as_u16(),
        });

        (status, axum::Json(body)).into_response()
    }
}
