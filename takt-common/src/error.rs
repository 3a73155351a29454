//! Common error types for TAKT

use thiserror::Error;
use uuid::Uuid;

/// Common result type for TAKT operations
pub type Result<T> = std::result::Result<T, Error>;

/// Common error types across TAKT services
///
/// Business-rule failures carry a specific message for the caller;
/// `Database`/`Io`/`Internal` wrap storage faults and are reported
/// generically at the HTTP boundary.
#[derive(Error, Debug)]
pub enum Error {
    /// Database operation error (wraps sqlx::Error)
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// I/O operation error (wraps std::io::Error)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration loading or validation error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Invalid user input or request parameter
    #[error("Invalid input: {0}")]
    Validation(String),

    /// Requested resource not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Operation not allowed for this worker (e.g. deactivated badge)
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// An open session already exists for the (post, worker) pair
    #[error("an open session already exists for this post and worker: {existing_id}")]
    DuplicateOpen { existing_id: Uuid },

    /// The session's end timestamp is already set
    #[error("session {0} is already closed")]
    AlreadyClosed(Uuid),

    /// A cancellation record already references this session
    #[error("session {0} is already cancelled")]
    AlreadyCancelled(Uuid),

    /// Other state conflict
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Internal server error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// True for the conflict family (duplicate open, already closed/cancelled)
    pub fn is_conflict(&self) -> bool {
        matches!(
            self,
            Error::DuplicateOpen { .. }
                | Error::AlreadyClosed(_)
                | Error::AlreadyCancelled(_)
                | Error::Conflict(_)
        )
    }
}
