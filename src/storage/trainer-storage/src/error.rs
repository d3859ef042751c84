//! Storage error types.

use thiserror::Error;

/// Errors that can occur during storage operations.
#[derive(Debug, Error)]
pub enum StorageError {
    /// Caller passed an unusable key or namespace.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Backend could not be opened or reached.
    #[error("connection failed: {0}")]
    ConnectionFailed(String),

    /// A query against the backend failed.
    #[error("query failed: {0}")]
    QueryFailed(String),

    /// Stored bytes could not be interpreted.
    #[error("serialization error: {0}")]
    Serialization(String),
}
