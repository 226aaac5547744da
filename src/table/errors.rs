//! Table error types
//!
//! Error codes:
//! - LS_UNKNOWN_FAMILY
//! - LS_UNSUPPORTED_OPERATION
//! - LS_ROW_MISMATCH
//! - LS_NOT_A_NUMBER
//! - LS_INVALID_ARGUMENT
//! - LS_LOCK_POISONED
//!
//! Absence of a row, family or qualifier is never an error at this layer.
//! Reads report it as `None` or an empty result.

use thiserror::Error;

/// Result type for table operations
pub type TableResult<T> = Result<T, TableError>;

/// Table errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TableError {
    /// Write targets a family that was never declared on the table
    #[error("Unknown column family: {family}")]
    UnknownFamily { family: String },

    /// Operation is outside the table contract
    #[error("Unsupported operation: {0}")]
    UnsupportedOperation(&'static str),

    /// A mutation addressed to a different row was handed to a row-atomic call
    #[error("Mutation row '{found}' does not match row '{expected}'")]
    RowMismatch { expected: String, found: String },

    /// Increment target holds a value that is not an 8-byte integer
    #[error("Cell {family}:{qualifier} in row '{row}' is {len} bytes, expected 8 for increment")]
    NotANumber {
        row: String,
        family: String,
        qualifier: String,
        len: usize,
    },

    /// Malformed request
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// A row or index lock was poisoned by a panicking writer
    #[error("Lock poisoned")]
    LockPoisoned,
}

impl TableError {
    /// Create an unknown family error from raw family bytes
    pub fn unknown_family(family: &[u8]) -> Self {
        TableError::UnknownFamily {
            family: String::from_utf8_lossy(family).into_owned(),
        }
    }

    /// Create a row mismatch error from raw row keys
    pub fn row_mismatch(expected: &[u8], found: &[u8]) -> Self {
        TableError::RowMismatch {
            expected: String::from_utf8_lossy(expected).into_owned(),
            found: String::from_utf8_lossy(found).into_owned(),
        }
    }

    /// Returns the stable error code
    pub fn code(&self) -> &'static str {
        match self {
            TableError::UnknownFamily { .. } => "LS_UNKNOWN_FAMILY",
            TableError::UnsupportedOperation(_) => "LS_UNSUPPORTED_OPERATION",
            TableError::RowMismatch { .. } => "LS_ROW_MISMATCH",
            TableError::NotANumber { .. } => "LS_NOT_A_NUMBER",
            TableError::InvalidArgument(_) => "LS_INVALID_ARGUMENT",
            TableError::LockPoisoned => "LS_LOCK_POISONED",
        }
    }

    /// Configuration and programmer errors that a retry cannot fix
    pub fn is_permanent(&self) -> bool {
        !matches!(self, TableError::LockPoisoned)
    }
}
