//! CLI-specific error types
//!
//! Errors returned from `run` are fatal. Errors raised while handling a
//! single request are reported on stdout and the session continues.

use std::io;

use thiserror::Error;

use crate::config::ConfigError;
use crate::lambda::LambdaError;

/// CLI error
#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("Malformed request: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error(transparent)]
    Lambda(#[from] LambdaError),
}

impl CliError {
    /// Get the error code string
    pub fn code(&self) -> &'static str {
        match self {
            CliError::Config(inner) => inner.code(),
            CliError::Io(_) => "LS_CLI_IO",
            CliError::Json(_) => "LS_CLI_MALFORMED_REQUEST",
            CliError::InvalidRequest(_) => "LS_CLI_INVALID_REQUEST",
            CliError::Lambda(inner) => inner.code(),
        }
    }

    /// True if the session cannot continue after this error
    pub fn is_fatal(&self) -> bool {
        matches!(self, CliError::Io(_) | CliError::Config(_))
    }
}

/// CLI result type
pub type CliResult<T> = Result<T, CliError>;
