//! Scanner - lazy iteration over a row range

use std::fmt;
use std::sync::{Arc, RwLock};
use std::vec;

use super::record::RowRecord;
use super::{Columns, RowResult, TableError, TableResult, TimeRange};
use crate::filter::{apply_filter, Filter};

/// Iterator over the rows of a `Scan`, in row-key order.
///
/// The set of candidate rows is fixed when the scanner is opened. Each row
/// is read under its own lock when the iterator reaches it, so a row
/// reflects the state at that moment. Rows deleted after opening come back
/// empty and are skipped; rows inserted after opening are not visited.
pub struct Scanner {
    rows: vec::IntoIter<(Vec<u8>, Arc<RwLock<RowRecord>>)>,
    columns: Columns,
    time_range: TimeRange,
    max_versions: usize,
    filter: Option<Box<dyn Filter>>,
    done: bool,
}

impl Scanner {
    pub(crate) fn new(
        rows: Vec<(Vec<u8>, Arc<RwLock<RowRecord>>)>,
        columns: Columns,
        time_range: TimeRange,
        max_versions: usize,
        filter: Option<Box<dyn Filter>>,
    ) -> Self {
        Self {
            rows: rows.into_iter(),
            columns,
            time_range,
            max_versions,
            filter,
            done: false,
        }
    }

    /// Candidate rows not yet visited.
    pub fn remaining(&self) -> usize {
        if self.done {
            0
        } else {
            self.rows.len()
        }
    }
}

impl Iterator for Scanner {
    type Item = TableResult<RowResult>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if self.done {
                return None;
            }
            if self
                .filter
                .as_ref()
                .map_or(false, |filter| filter.filter_all_remaining())
            {
                self.done = true;
                return None;
            }

            let (row, handle) = match self.rows.next() {
                Some(next) => next,
                None => {
                    self.done = true;
                    return None;
                }
            };

            let cells = {
                let record = match handle.read() {
                    Ok(record) => record,
                    Err(_) => {
                        self.done = true;
                        return Some(Err(TableError::LockPoisoned));
                    }
                };
                let cells =
                    record.cells(&row, &self.columns, &self.time_range, self.max_versions);
                match self.filter.as_mut() {
                    Some(filter) if !cells.is_empty() => apply_filter(&mut **filter, &row, cells),
                    _ => cells,
                }
            };

            if cells.is_empty() {
                continue;
            }
            return Some(Ok(RowResult::new(row, cells)));
        }
    }
}

impl fmt::Debug for Scanner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Scanner")
            .field("remaining", &self.remaining())
            .field("columns", &self.columns)
            .field("time_range", &self.time_range)
            .field("max_versions", &self.max_versions)
            .field("filter", &self.filter)
            .finish()
    }
}
