//! Error types for Labbook core operations.
//!
//! This module defines the error hierarchy for all core operations.
//! Errors are descriptive at the core level; the CLI layer maps them
//! to exit codes and user-friendly messages.

use thiserror::Error;

/// Result type alias for Labbook operations.
pub type Result<T> = std::result::Result<T, LabbookError>;

/// Core error type for Labbook operations.
#[derive(Debug, Error)]
pub enum LabbookError {
    /// Referenced entity does not exist
    #[error("Not found: {0}")]
    NotFound(String),

    /// Malformed or disallowed input; the message names the violated constraint
    #[error("Validation error: {0}")]
    Validation(String),

    /// Uniqueness violation (duplicate digest, second default template, ...)
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Storage backend error (generic)
    #[error("Storage error: {0}")]
    Storage(String),

    /// SQLite-specific storage error
    #[error("SQLite error: {source}")]
    Sqlite {
        #[from]
        source: rusqlite::Error,
    },

    /// I/O error
    #[error("I/O error: {source}")]
    Io {
        #[from]
        source: std::io::Error,
    },

    /// JSON serialization/deserialization error
    #[error("JSON error: {source}")]
    Json {
        #[from]
        source: serde_json::Error,
    },

    /// Chart rendering or document encoding failure
    #[error("Render error: {0}")]
    Render(String),

    /// Generic error (fallback)
    #[error("{0}")]
    Other(String),
}

/// Coarse classification used by callers that map errors to status codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    NotFound,
    Validation,
    Conflict,
    Fatal,
}

impl LabbookError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            LabbookError::NotFound(_) => ErrorKind::NotFound,
            LabbookError::Validation(_) => ErrorKind::Validation,
            LabbookError::Conflict(_) => ErrorKind::Conflict,
            _ => ErrorKind::Fatal,
        }
    }

    pub fn not_found(what: &str, id: i64) -> Self {
        LabbookError::NotFound(format!("{} {} not found", what, id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_classification() {
        assert_eq!(
            LabbookError::not_found("Entry", 7).kind(),
            ErrorKind::NotFound
        );
        assert_eq!(
            LabbookError::Validation("bad".into()).kind(),
            ErrorKind::Validation
        );
        assert_eq!(
            LabbookError::Conflict("dup".into()).kind(),
            ErrorKind::Conflict
        );
        let io = LabbookError::from(std::io::Error::new(std::io::ErrorKind::Other, "disk"));
        assert_eq!(io.kind(), ErrorKind::Fatal);
    }

    #[test]
    fn test_not_found_message() {
        let err = LabbookError::not_found("Experiment", 42);
        assert_eq!(err.to_string(), "Not found: Experiment 42 not found");
    }
}
