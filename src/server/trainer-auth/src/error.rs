//! Authentication error types.

use thiserror::Error;

/// Errors that can occur while handling a session.
#[derive(Debug, Error)]
pub enum AuthError {
    /// Login response did not carry usable credentials.
    #[error("invalid credentials: {0}")]
    InvalidCredentials(String),

    /// Missing authentication token.
    #[error("missing authentication token")]
    MissingToken,

    /// Storage error.
    #[error("storage error: {0}")]
    Storage(String),
}

impl From<trainer_storage::StorageError> for AuthError {
    fn from(e: trainer_storage::StorageError) -> Self {
        AuthError::Storage(e.to_string())
    }
}
