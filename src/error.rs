//! Error types for chatrelay.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

/// Result type alias for chatrelay operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for chatrelay.
///
/// Business logic returns these; the single [`IntoResponse`] impl maps each
/// kind to a status code and the shared `{error, message}` envelope at the
/// HTTP boundary.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(#[from] crate::config::ConfigError),

    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    NotFound(String),

    #[error("Authentication failed: {0}")]
    Auth(#[from] crate::auth::AuthError),

    #[error("Upstream request failed: {0}")]
    Upstream(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Short label used as the `error` field of the envelope.
    fn label(&self) -> &'static str {
        match self {
            Error::Config(_) => "Configuration error",
            Error::BadRequest(_) => "Bad request",
            Error::NotFound(_) => "Not found",
            Error::Auth(_) => "Authentication error",
            Error::Upstream(_) => "Upstream error",
            Error::Internal(_) => "Internal server error",
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let status = match &self {
            Error::BadRequest(_) => StatusCode::BAD_REQUEST,
            Error::NotFound(_) => StatusCode::NOT_FOUND,
            Error::Config(_) | Error::Auth(_) | Error::Upstream(_) | Error::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };

        let body = serde_json::json!({
            "error": self.label(),
            "message": self.to_string(),
        });

        (status, axum::Json(body)).into_response()
    }
}
