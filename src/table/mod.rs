//! Versioned table subsystem
//!
//! An in-memory store addressed by (row, family, qualifier), holding every
//! version of each column keyed by timestamp.
//!
//! # Data model
//!
//! - A row exists exactly while it owns at least one version
//! - Families are declared on the table; writes to any other family fail
//! - Qualifiers are free-form within a family
//! - Reads return the newest version unless asked for more
//!
//! # Usage
//!
//! ```ignore
//! use lambdastore::table::{Get, Put, Table};
//!
//! let table = Table::new("users", ["f"]);
//! table.put(Put::new("row1").add_column("f", "name", "ada"))?;
//! let row = table.get(Get::new("row1"))?;
//! ```

mod cell;
mod errors;
mod latency;
mod mutation;
mod query;
mod record;
mod scanner;
mod store;
mod timestamp;

pub use cell::{Cell, RowResult};
pub use errors::{TableError, TableResult};
pub use latency::Latency;
pub use mutation::{
    Action, ActionResult, Append, Delete, DeleteTarget, Increment, Mutation, Put, PutCell,
    RowMutations,
};
pub use query::{Columns, Get, Scan, TimeRange};
pub use record::ColumnKey;
pub use scanner::Scanner;
pub use store::Table;
pub use timestamp::{Clock, Timestamp};
