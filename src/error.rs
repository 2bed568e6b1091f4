//! Error types for the cache engine
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
/// Unified error type for the cache engine and its HTTP surface.
///
/// Missing keys and unknown partitions are not errors for the plain cache
/// operations; these variants only surface from the clone-on-read API, the
/// transaction API and request validation.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CacheError {
    /// Key not found in cache
    #[error("Key not found: {0}")]
    NotFound(String),

    /// Stored value refused to be deep-cloned
    #[error("Value not clonable: {0}")]
    NotClonable(String),

    /// No transaction was ever opened with this ID (or it was purged)
    #[error("Transaction not found: {0}")]
    TransactionNotFound(String),

    /// Transaction was already committed or rolled back
    #[error("Transaction already closed: {0}")]
    TransactionClosed(String),

    /// Invalid request data
    #[error("Invalid request: {0}")]
    InvalidRequest(String),
}

impl CacheError {
    /// HTTP status used when the error crosses the API boundary.
    pub fn status_code(&self) -> StatusCode {
        match self {
            CacheError::NotFound(_) => StatusCode::NOT_FOUND,
            CacheError::NotClonable(_) => StatusCode::UNPROCESSABLE_ENTITY,
            CacheError::TransactionNotFound(_) => StatusCode::NOT_FOUND,
            CacheError::TransactionClosed(_) => StatusCode::CONFLICT,
            CacheError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
        }
    }
}

// == IntoResponse Implementation ==
impl IntoResponse for CacheError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        (status, Json(ErrorResponse::new(self.to_string()))).into_response()
    }
}

// == Result Type Alias ==
/// Convenience Result type for the cache engine.
pub type Result<T> = std::result::Result<T, CacheError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = CacheError::TransactionClosed("abc".to_string());
        assert_eq!(err.to_string(), "Transaction already closed: abc");
    }

    #[test]
    fn test_error_status_codes() {
        let cases = vec![
            (CacheError::NotFound("k".into()), StatusCode::NOT_FOUND),
            (CacheError::NotClonable("k".into()), StatusCode::UNPROCESSABLE_ENTITY),
            (CacheError::TransactionNotFound("t".into()), StatusCode::NOT_FOUND),
            (CacheError::TransactionClosed("t".into()), StatusCode::CONFLICT),
            (CacheError::InvalidRequest("bad".into()), StatusCode::BAD_REQUEST),
        ];

        for (error, expected) in cases {
            assert_eq!(error.clone().into_response().status(), expected, "{}", error);
        }
    }
}
