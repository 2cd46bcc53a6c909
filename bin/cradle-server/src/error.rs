//! Unified server error type.
//!
//! Every handler returns `Result<T, ServerError>`, which implements
//! [`axum::response::IntoResponse`] so errors are automatically converted
//! to a JSON-body HTTP response with an appropriate status code.
//!
//! **Security note:** Internal errors (Database, Internal) are logged with
//! full detail but only a generic message is returned to the caller so that
//! file paths, SQL, or other implementation details never leak to clients.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;
use tracing::error;

use crate::llm::LlmError;

/// All errors that can occur in the cradle-server request lifecycle.
#[derive(Debug, Error)]
pub enum ServerError {
    /// The caller sent an invalid or malformed request.
    #[error("bad request: {0}")]
    BadRequest(String),

    /// Missing, expired, or otherwise unusable credentials.
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    /// Authenticated, but the caller's role does not allow the operation.
    #[error("forbidden: {0}")]
    Forbidden(String),

    /// The caller referenced a resource that does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// The upstream model API failed.
    #[error("upstream error: {0}")]
    Upstream(#[from] LlmError),

    /// Propagated from the SQLite store.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// An unclassified internal server error.
    #[error("internal error: {0}")]
    Internal(String),
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let (status, client_message) = match &self {
            // Client-facing errors: expose the message directly.
            ServerError::BadRequest(m) => (StatusCode::BAD_REQUEST, m.clone()),
            ServerError::Unauthorized(m) => (StatusCode::UNAUTHORIZED, m.clone()),
            ServerError::Forbidden(m) => (StatusCode::FORBIDDEN, m.clone()),
            ServerError::NotFound(m) => (StatusCode::NOT_FOUND, m.clone()),

            // The model call failed: the wrapped cause goes back to the
            // client, matching the error contract of the chat endpoint.
            ServerError::Upstream(e) => {
                error!(error = %e, "model API call failed");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    format!("Failed to get response: {e}"),
                )
            }

            // Internal errors: log the full detail, return a generic message.
            ServerError::Database(e) => {
                error!(error = %e, "database error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal server error".to_owned(),
                )
            }
            ServerError::Internal(m) => {
                error!(message = %m, "internal server error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal server error".to_owned(),
                )
            }
        };
        (status, Json(json!({ "error": client_message }))).into_response()
    }
}

impl From<anyhow::Error> for ServerError {
    fn from(e: anyhow::Error) -> Self {
        // Log the full error chain before discarding it so that diagnostic
        // detail is preserved in the server logs even though clients only
        // see a generic message.
        error!(error = ?e, "converting anyhow error to ServerError::Internal");
        ServerError::Internal(e.to_string())
    }
}
