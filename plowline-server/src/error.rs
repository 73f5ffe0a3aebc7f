//! Server error types

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use plowline_core::StoreError;
use thiserror::Error;

/// Errors that can occur in the plowline server
#[derive(Debug, Error)]
pub enum ServerError {
    /// Failed to bind to the specified address
    #[error("failed to bind to {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    /// Invalid retention settings
    #[error("invalid event store configuration: {0}")]
    Store(#[from] StoreError),

    /// Internal server error
    #[error("internal error: {0}")]
    Internal(String),
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        tracing::error!(error = %self, "Request failed");
        (StatusCode::INTERNAL_SERVER_ERROR, self.to_string()).into_response()
    }
}

/// Reasons an ingestion payload is rejected before reaching the store
#[derive(Debug, Error, PartialEq, Eq)]
pub enum IngestError {
    #[error("Invalid JSON payload")]
    InvalidJson,

    #[error("Missing schema field")]
    MissingSchema,

    #[error("Missing data field")]
    MissingData,

    /// `data` was an array without a single object in it
    #[error("Invalid data format")]
    NoRecords,

    #[error("Invalid data format - must be an object or array")]
    InvalidDataShape,

    #[error("Message cannot be empty")]
    EmptyMessage,
}

impl IntoResponse for IngestError {
    fn into_response(self) -> Response {
        (StatusCode::BAD_REQUEST, self.to_string()).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ingest_error_is_bad_request() {
        let response = IngestError::MissingSchema.into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn server_error_is_internal() {
        let response = ServerError::Internal("boom".to_string()).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn server_error_converts_from_store_error() {
        let error: ServerError = StoreError::InvalidCapacity(0).into();
        assert!(error.to_string().contains("invalid event store configuration"));
    }
}
