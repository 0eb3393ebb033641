//! Error types for bucket voting.

use thiserror::Error;

/// Result type for voting operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while handling votes.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum Error {
    /// A directive was used incorrectly by the page author.
    #[error("Usage error: {0}")]
    Usage(String),

    /// A submitted value could not be accepted. The whole batch is rejected.
    #[error("{0}")]
    Validation(String),

    /// Anonymous viewers cannot submit votes.
    #[error("Only logged-in users can vote.")]
    AuthenticationRequired,

    /// The viewer lacks the group membership required for the operation.
    #[error("Not authorized: {0}")]
    Unauthorized(String),

    /// The posted session key does not match the session being rendered.
    #[error("Attempted to set the vote parameters for session {submitted:?} while rendering {expected:?}")]
    SessionKeyMismatch { expected: String, submitted: String },

    /// Storage backend failure
    #[error("Storage error: {0}")]
    Storage(String),
}

impl Error {
    /// Errors that are shown inline to the voter instead of aborting the request.
    pub fn is_user_visible(&self) -> bool {
        matches!(self, Error::Validation(_) | Error::AuthenticationRequired)
    }

    /// Errors that must abort the whole request.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Error::Unauthorized(_) | Error::SessionKeyMismatch { .. } | Error::Storage(_)
        )
    }
}
