//! Realtime/bulk reconciliation
//!
//! Every key lives in one row of a table with the column family `f`:
//!
//! - `f:BULK` holds the value produced by the batch layer
//! - `f:REALTIME` holds a fresher value produced since the last batch
//!
//! Readers combine the two, preferring REALTIME while it is newer than
//! BULK. `cleanup` folds REALTIME into BULK so that, once it finishes, no
//! row carries a REALTIME value.

mod engine;
mod errors;
mod report;
mod state;

use std::fmt;

pub use engine::LambdaTable;
pub use errors::{LambdaError, LambdaResult};
pub use report::{CleanupFailure, CleanupReport};
pub use state::{CleanupAction, LambdaRow, RowState};

/// Column family holding both reconciliation columns
pub const FAMILY: &[u8] = b"f";

/// Qualifier of the realtime column
pub const REALTIME: &[u8] = b"REALTIME";

/// Qualifier of the bulk column
pub const BULK: &[u8] = b"BULK";

/// One of the two reconciliation columns
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Column {
    Bulk,
    Realtime,
}

impl Column {
    #[inline]
    pub fn qualifier(&self) -> &'static [u8] {
        match self {
            Column::Bulk => BULK,
            Column::Realtime => REALTIME,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Column::Bulk => "BULK",
            Column::Realtime => "REALTIME",
        }
    }
}

impl fmt::Display for Column {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
