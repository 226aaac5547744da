//! Server-side filters for reads and scans
//!
//! A filter is an optional stateful object attached to a `Get` or `Scan`.
//! It sees each candidate row key and each candidate cell and decides what
//! the caller receives. Filters are evaluated inside the table, under the
//! row's read lock, after column selection, time range and version limits
//! have been applied.

mod comparator;
mod filters;
mod list;
mod pipeline;

pub use comparator::{CompareOp, Comparator};
pub use filters::{
    ColumnCountGetFilter, FamilyFilter, FirstKeyOnlyFilter, PageFilter, PrefixFilter,
    QualifierFilter, RowFilter, SingleColumnValueFilter, ValueFilter,
};
pub use list::{FilterList, Operator};
pub use pipeline::{apply_filter, Filter, ReturnCode};
