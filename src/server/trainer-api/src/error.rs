//! API client error types.

use thiserror::Error;

/// Errors that can occur talking to the REST API.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Request could not be sent or the body could not be read.
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// API answered with a failure.
    #[error("{message}")]
    Rejected {
        /// HTTP status code.
        status: u16,
        /// Message from the API, or a default for the endpoint.
        message: String,
    },

    /// API answered 2xx with an unusable body.
    #[error("invalid response: {0}")]
    InvalidResponse(String),

    /// Client misconfiguration (bad base URL, etc.).
    #[error("configuration error: {0}")]
    Configuration(String),
}

impl ApiError {
    /// HTTP status of a rejection, if this is one.
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Rejected { status, .. } => Some(*status),
            ApiError::Http(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }
}

impl From<trainer_auth::AuthError> for ApiError {
    fn from(e: trainer_auth::AuthError) -> Self {
        ApiError::InvalidResponse(e.to_string())
    }
}
