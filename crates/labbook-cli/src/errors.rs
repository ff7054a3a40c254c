//! Errors raised by the CLI layer itself, and the mapping from any error to
//! a process exit code.
//!
//! Handlers return `anyhow::Result` and propagate core errors with `?`;
//! [`exit_code`] recovers the class from the error chain in `main`.

use std::fmt;

use labbook_core::{ErrorKind, LabbookError};

use crate::constants::exit_codes;

#[derive(Debug)]
pub enum CliError {
    /// Missing notebook or input file; `hint` is printed on its own line
    NotFound { message: String, hint: String },

    InvalidInput(String),

    /// `labbook check` found a broken invariant
    IntegrityFailed(String),
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CliError::NotFound { message, hint } => {
                write!(f, "{}\n{}", message, hint)
            }
            CliError::InvalidInput(message) => write!(f, "{}", message),
            CliError::IntegrityFailed(message) => write!(f, "Integrity check failed: {}", message),
        }
    }
}

impl std::error::Error for CliError {}

impl CliError {
    pub fn not_found(message: impl Into<String>, hint: impl Into<String>) -> Self {
        CliError::NotFound {
            message: message.into(),
            hint: hint.into(),
        }
    }

    pub fn invalid_input(message: impl Into<String>) -> Self {
        CliError::InvalidInput(message.into())
    }

    pub fn exit_code(&self) -> i32 {
        match self {
            CliError::NotFound { .. } => exit_codes::NOT_FOUND,
            CliError::InvalidInput(_) => exit_codes::INVALID_INPUT,
            CliError::IntegrityFailed(_) => exit_codes::INTEGRITY_FAILED,
        }
    }
}

/// Exit code for any error reaching `main`.
pub fn exit_code(err: &anyhow::Error) -> i32 {
    if let Some(cli) = err.downcast_ref::<CliError>() {
        return cli.exit_code();
    }
    if let Some(core) = err.downcast_ref::<LabbookError>() {
        return match core.kind() {
            ErrorKind::NotFound => exit_codes::NOT_FOUND,
            ErrorKind::Validation => exit_codes::INVALID_INPUT,
            ErrorKind::Conflict => exit_codes::CONFLICT,
            ErrorKind::Fatal => exit_codes::GENERAL,
        };
    }
    exit_codes::GENERAL
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_core_errors_map_to_exit_codes() {
        let err = anyhow::Error::from(LabbookError::not_found("Entry", 3));
        assert_eq!(exit_code(&err), exit_codes::NOT_FOUND);

        let err = anyhow::Error::from(LabbookError::Conflict("dup".into()));
        assert_eq!(exit_code(&err), exit_codes::CONFLICT);

        let err = anyhow::Error::from(LabbookError::Validation("bad".into()));
        assert_eq!(exit_code(&err), exit_codes::INVALID_INPUT);
    }

    #[test]
    fn test_cli_errors_keep_their_code() {
        let err = anyhow::Error::from(CliError::not_found("No notebook", "Hint: run init"));
        assert_eq!(exit_code(&err), exit_codes::NOT_FOUND);
        assert_eq!(exit_code(&anyhow::anyhow!("boom")), exit_codes::GENERAL);
    }
}
