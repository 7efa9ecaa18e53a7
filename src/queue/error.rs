//! Error types for queue operations.

use thiserror::Error;

/// Errors that can occur during queue operations.
#[derive(Debug, Clone, Error)]
pub enum QueueError {
    /// Database operation failed.
    #[error("database error: {message}")]
    Database {
        /// Human-readable database error text.
        message: String,
    },

    /// Job record not found.
    #[error(
        "job not found: id {0}\n  Suggestion: The job may have been purged or the ID is incorrect"
    )]
    ItemNotFound(i64),

    /// Stored or supplied payload does not match any known job kind.
    #[error("invalid job payload: {message}")]
    Payload {
        /// Why the payload was rejected.
        message: String,
    },
}

impl From<sqlx::Error> for QueueError {
    fn from(err: sqlx::Error) -> Self {
        Self::Database {
            message: err.to_string(),
        }
    }
}
