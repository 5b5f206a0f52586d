//! Error types for the cache crate
//!
//! Provides unified error handling using thiserror.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error;

use crate::models::ErrorResponse;

// == Cache Error Enum ==
/// Unified error type for cache operations and the admin surface.
#[derive(Error, Debug)]
pub enum CacheError {
    /// Caller misuse, such as a zero max size or an oversized TTL
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Mutation attempted through a read-only view
    #[error("Unsupported operation: {0}")]
    Unsupported(String),

    /// No registered cache matches the request
    #[error("Not found: {0}")]
    NotFound(String),
}

// == IntoResponse Implementation ==
impl IntoResponse for CacheError {
    fn into_response(self) -> Response {
        let status = match &self {
            CacheError::InvalidArgument(_) => StatusCode::BAD_REQUEST,
            CacheError::Unsupported(_) => StatusCode::METHOD_NOT_ALLOWED,
            CacheError::NotFound(_) => StatusCode::NOT_FOUND,
        };

        (status, Json(ErrorResponse::new(self.to_string()))).into_response()
    }
}

// == Result Type Alias ==
/// Convenience Result type for the cache crate.
pub type Result<T> = std::result::Result<T, CacheError>;
