//! Error types for the cache
//!
//! Store and cache errors stay internal to the cache and are collapsed into
//! misses and no-ops at its public boundary. `ApiError` is what the HTTP
//! surface reports.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

// == Store Error ==
/// Failures raised by a backing key-value store.
#[derive(Error, Debug)]
pub enum StoreError {
    /// The write would push the store past its byte quota
    #[error("Quota exceeded: {needed} bytes needed, quota is {quota} bytes")]
    QuotaExceeded { needed: usize, quota: usize },

    /// The store cannot be used right now
    #[error("Store unavailable: {0}")]
    Unavailable(String),

    /// Filesystem failure in a persistent store
    #[error("Store I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The store contents could not be encoded
    #[error("Store encoding error: {0}")]
    Format(#[from] serde_json::Error),
}

// == Cache Error ==
/// Internal failures of the TTL cache.
#[derive(Error, Debug)]
pub enum CacheError {
    /// Empty caller key
    #[error("Cache key cannot be empty")]
    InvalidKey,

    /// Zero TTL
    #[error("TTL must be positive")]
    InvalidTtl,

    /// Clearing without a prefix would wipe the whole shared store
    #[error("Refusing to clear with an empty namespace")]
    EmptyNamespace,

    /// The value could not be serialized
    #[error("Failed to serialize entry for '{key}': {source}")]
    Serialize {
        key: String,
        #[source]
        source: serde_json::Error,
    },

    /// A persisted record could not be deserialized
    #[error("Corrupt entry for '{key}': {source}")]
    Corrupt {
        key: String,
        #[source]
        source: serde_json::Error,
    },

    /// The backing store rejected the operation
    #[error(transparent)]
    Store(#[from] StoreError),
}

// == API Error ==
/// Errors reported by the HTTP surface.
#[derive(Error, Debug)]
pub enum ApiError {
    /// Key absent, expired or unreadable
    #[error("Key not found: {0}")]
    NotFound(String),

    /// Invalid request data
    #[error("Invalid request: {0}")]
    InvalidRequest(String),
}

// == IntoResponse Implementation ==
impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self {
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
        };

        let body = Json(json!({
            "error": self.to_string()
        }));

        (status, body).into_response()
    }
}

// == Result Type Alias ==
/// Convenience Result type for HTTP handlers.
pub type Result<T> = std::result::Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_maps_to_404() {
        let response = ApiError::NotFound("quote_AAPL".to_string()).into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn test_invalid_request_maps_to_400() {
        let response = ApiError::InvalidRequest("empty key".to_string()).into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_store_error_converts_into_cache_error() {
        let err: CacheError = StoreError::Unavailable("locked".to_string()).into();
        assert!(matches!(err, CacheError::Store(StoreError::Unavailable(_))));
        assert_eq!(err.to_string(), "Store unavailable: locked");
    }

    #[test]
    fn test_quota_message_names_sizes() {
        let err = StoreError::QuotaExceeded {
            needed: 12,
            quota: 10,
        };
        assert!(err.to_string().contains("12"));
        assert!(err.to_string().contains("10"));
    }
}
