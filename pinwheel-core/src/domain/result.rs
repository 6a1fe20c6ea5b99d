//! Result and error types for the core library
//!
//! Business outcomes (already entered, already drawn, insufficient balance)
//! are NOT errors; services report them as tagged enums so callers can
//! render the right message. This type covers the failures underneath:
//! storage, configuration, and the external points ledger.

use thiserror::Error;

/// Core library error type
#[derive(Error, Debug)]
pub enum Error {
    #[error("Database error: {0}")]
    Database(String),

    #[error("Not found: {0}")]
    NotFound(String),

    /// Precondition violated by existing state (self-merge, credential
    /// owned elsewhere). Never retried automatically.
    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Configuration error: {0}")]
    Config(String),

    /// Transient failure talking to the external points ledger.
    /// Safe to retry at the caller's discretion.
    #[error("Ledger error: {0}")]
    Ledger(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Create a database error
    pub fn database(msg: impl Into<String>) -> Self {
        Self::Database(msg.into())
    }

    /// Create a not found error
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    /// Create a conflict error
    pub fn conflict(msg: impl Into<String>) -> Self {
        Self::Conflict(msg.into())
    }

    /// Create a validation error
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Create a transient ledger error
    pub fn ledger(msg: impl Into<String>) -> Self {
        Self::Ledger(msg.into())
    }

    /// True if the failure came from the external ledger and a retry
    /// might succeed.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Ledger(_))
    }
}

// anyhow surfaces only from the storage layer in this crate, so a bare
// anyhow error is a database failure by construction.
impl From<anyhow::Error> for Error {
    fn from(err: anyhow::Error) -> Self {
        Self::Database(err.to_string())
    }
}

/// Core library result type
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transient_classification() {
        assert!(Error::ledger("timeout").is_transient());
        assert!(!Error::conflict("already entered").is_transient());
        assert!(!Error::not_found("no such user").is_transient());
    }

    #[test]
    fn test_error_messages_keep_category_prefix() {
        let err = Error::database("unique constraint");
        assert!(err.to_string().contains("Database error"));

        let err = Error::ledger("HTTP 503");
        assert!(err.to_string().contains("Ledger error"));
    }
}
