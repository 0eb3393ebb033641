//! Error types for the vote node.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

/// Result type for node operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in the vote node.
#[derive(Debug, Error)]
pub enum Error {
    /// Voting error
    #[error(transparent)]
    Vote(#[from] bucketvote_core::Error),

    /// Storage error
    #[error("Storage error: {0}")]
    Storage(String),

    /// Invalid configuration
    #[error("Config error: {0}")]
    Config(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<rocksdb::Error> for Error {
    fn from(e: rocksdb::Error) -> Self {
        Error::Storage(e.to_string())
    }
}

impl Error {
    /// HTTP status for this error.
    pub fn status(&self) -> StatusCode {
        use bucketvote_core::Error as Vote;

        match self {
            Error::Vote(Vote::Usage(_)) => StatusCode::BAD_REQUEST,
            Error::Vote(Vote::AuthenticationRequired) => StatusCode::UNAUTHORIZED,
            Error::Vote(Vote::Unauthorized(_)) | Error::Vote(Vote::SessionKeyMismatch { .. }) => {
                StatusCode::FORBIDDEN
            }
            Error::Vote(Vote::Validation(_)) => StatusCode::UNPROCESSABLE_ENTITY,
            Error::Vote(Vote::Storage(_))
            | Error::Storage(_)
            | Error::Config(_)
            | Error::Serialization(_)
            | Error::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!("Request failed: {}", self);
        }

        (status, self.to_string()).into_response()
    }
}
