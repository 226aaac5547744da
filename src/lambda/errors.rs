//! Reconciliation error types
//!
//! Error codes:
//! - LS_NOT_FOUND
//! - LS_INVARIANT_VIOLATION
//! - any `TableError` code, passed through

use thiserror::Error;

use crate::table::{TableError, Timestamp};

/// Result type for reconciliation operations
pub type LambdaResult<T> = Result<T, LambdaError>;

/// Reconciliation errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LambdaError {
    /// Nothing stored where a value was required
    #[error("Cannot retrieve {target} for key '{key}'")]
    NotFound { key: String, target: String },

    /// Bulk is not older than realtime; reported, never repaired by reads
    #[error(
        "Bulk timestamp {bulk_ts} is not older than realtime timestamp {realtime_ts} for key '{key}'"
    )]
    InvariantViolation {
        key: String,
        bulk_ts: Timestamp,
        realtime_ts: Timestamp,
    },

    /// Failure of the underlying table
    #[error(transparent)]
    Table(#[from] TableError),
}

impl LambdaError {
    pub(crate) fn not_found(key: &str, target: impl Into<String>) -> Self {
        LambdaError::NotFound {
            key: key.to_string(),
            target: target.into(),
        }
    }

    /// Returns the stable error code
    pub fn code(&self) -> &'static str {
        match self {
            LambdaError::NotFound { .. } => "LS_NOT_FOUND",
            LambdaError::InvariantViolation { .. } => "LS_INVARIANT_VIOLATION",
            LambdaError::Table(inner) => inner.code(),
        }
    }

    /// True for absence, which callers usually treat as a normal outcome
    pub fn is_not_found(&self) -> bool {
        matches!(self, LambdaError::NotFound { .. })
    }
}
