//! Handler error type.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;
use tracing::warn;

use trainer_access::AccessError;
use trainer_api::ApiError;

/// Errors surfaced by server handlers and bootstrap.
#[derive(Debug, Error)]
pub enum ServerError {
    /// The REST API refused or failed.
    #[error(transparent)]
    Api(#[from] ApiError),

    /// The route policy could not be loaded.
    #[error(transparent)]
    Policy(#[from] AccessError),

    /// The forwarding target failed.
    #[error("upstream error: {0}")]
    Upstream(String),

    /// Request body could not be read.
    #[error("bad request: {0}")]
    BadRequest(String),

    /// No page renderer configured for an allowed page.
    #[error("not found")]
    NotFound,

    /// Invalid server configuration.
    #[error("configuration error: {0}")]
    Config(String),
}

impl ServerError {
    fn status(&self) -> StatusCode {
        match self {
            ServerError::Api(e) => e
                .status()
                .and_then(|s| StatusCode::from_u16(s).ok())
                .unwrap_or(StatusCode::BAD_GATEWAY),
            ServerError::Upstream(_) => StatusCode::BAD_GATEWAY,
            ServerError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ServerError::NotFound => StatusCode::NOT_FOUND,
            ServerError::Policy(_) | ServerError::Config(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            warn!(error = %self, "Request failed");
        }
        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}
