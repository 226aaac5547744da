//! Built-in filters

use super::{CompareOp, Comparator, Filter, ReturnCode};
use crate::table::Cell;

/// Keeps rows whose key starts with a prefix.
///
/// Rows are visited in key order, so once a key sorts after the prefix
/// without matching it no later row can match and the scan ends.
#[derive(Debug, Clone)]
pub struct PrefixFilter {
    prefix: Vec<u8>,
    passed_prefix: bool,
}

impl PrefixFilter {
    pub fn new(prefix: impl Into<Vec<u8>>) -> Self {
        Self {
            prefix: prefix.into(),
            passed_prefix: false,
        }
    }
}

impl Filter for PrefixFilter {
    fn filter_row_key(&mut self, row: &[u8]) -> bool {
        if row.starts_with(&self.prefix) {
            return false;
        }
        if row > self.prefix.as_slice() {
            self.passed_prefix = true;
        }
        true
    }

    fn filter_all_remaining(&self) -> bool {
        self.passed_prefix
    }
}

/// Keeps rows whose key satisfies a comparison.
#[derive(Debug, Clone)]
pub struct RowFilter {
    op: CompareOp,
    comparator: Comparator,
}

impl RowFilter {
    pub fn new(op: CompareOp, comparator: Comparator) -> Self {
        Self { op, comparator }
    }
}

impl Filter for RowFilter {
    fn filter_row_key(&mut self, row: &[u8]) -> bool {
        !self.comparator.matches(self.op, row)
    }
}

/// Keeps cells whose family satisfies a comparison.
#[derive(Debug, Clone)]
pub struct FamilyFilter {
    op: CompareOp,
    comparator: Comparator,
}

impl FamilyFilter {
    pub fn new(op: CompareOp, comparator: Comparator) -> Self {
        Self { op, comparator }
    }
}

impl Filter for FamilyFilter {
    fn filter_cell(&mut self, cell: &Cell) -> ReturnCode {
        if self.comparator.matches(self.op, cell.family()) {
            ReturnCode::Include
        } else {
            ReturnCode::NextColumn
        }
    }
}

/// Keeps cells whose qualifier satisfies a comparison.
#[derive(Debug, Clone)]
pub struct QualifierFilter {
    op: CompareOp,
    comparator: Comparator,
}

impl QualifierFilter {
    pub fn new(op: CompareOp, comparator: Comparator) -> Self {
        Self { op, comparator }
    }
}

impl Filter for QualifierFilter {
    fn filter_cell(&mut self, cell: &Cell) -> ReturnCode {
        if self.comparator.matches(self.op, cell.qualifier()) {
            ReturnCode::Include
        } else {
            ReturnCode::NextColumn
        }
    }
}

/// Keeps cells whose value satisfies a comparison. Judged per version.
#[derive(Debug, Clone)]
pub struct ValueFilter {
    op: CompareOp,
    comparator: Comparator,
}

impl ValueFilter {
    pub fn new(op: CompareOp, comparator: Comparator) -> Self {
        Self { op, comparator }
    }
}

impl Filter for ValueFilter {
    fn filter_cell(&mut self, cell: &Cell) -> ReturnCode {
        if self.comparator.matches(self.op, cell.value()) {
            ReturnCode::Include
        } else {
            ReturnCode::Skip
        }
    }
}

/// Returns only the first cell of each row.
#[derive(Debug, Clone, Default)]
pub struct FirstKeyOnlyFilter {
    found: bool,
}

impl FirstKeyOnlyFilter {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Filter for FirstKeyOnlyFilter {
    fn reset(&mut self) {
        self.found = false;
    }

    fn filter_cell(&mut self, _cell: &Cell) -> ReturnCode {
        if self.found {
            return ReturnCode::NextRow;
        }
        self.found = true;
        ReturnCode::Include
    }
}

/// Returns the latest version of at most `limit` columns per row.
#[derive(Debug, Clone)]
pub struct ColumnCountGetFilter {
    limit: usize,
    count: usize,
    current: Option<(Vec<u8>, Vec<u8>)>,
}

impl ColumnCountGetFilter {
    pub fn new(limit: usize) -> Self {
        Self {
            limit,
            count: 0,
            current: None,
        }
    }
}

impl Filter for ColumnCountGetFilter {
    fn reset(&mut self) {
        self.count = 0;
        self.current = None;
    }

    fn filter_cell(&mut self, cell: &Cell) -> ReturnCode {
        if let Some((family, qualifier)) = &self.current {
            if cell.matches_column(family, qualifier) {
                return ReturnCode::NextColumn;
            }
        }

        self.count += 1;
        if self.count > self.limit {
            return ReturnCode::NextRow;
        }
        self.current = Some((cell.family().to_vec(), cell.qualifier().to_vec()));
        ReturnCode::Include
    }
}

/// Limits a scan to `page_size` rows.
///
/// Only rows that reach the whole-row stage are counted, so place it last
/// in a `MustPassAll` list.
#[derive(Debug, Clone)]
pub struct PageFilter {
    page_size: usize,
    rows_accepted: usize,
}

impl PageFilter {
    pub fn new(page_size: usize) -> Self {
        Self {
            page_size,
            rows_accepted: 0,
        }
    }
}

impl Filter for PageFilter {
    fn has_filter_row(&self) -> bool {
        true
    }

    fn filter_row(&mut self) -> bool {
        self.rows_accepted += 1;
        self.rows_accepted > self.page_size
    }

    fn filter_all_remaining(&self) -> bool {
        self.rows_accepted >= self.page_size
    }
}

/// Keeps rows whose latest version of one column satisfies a comparison.
///
/// The column must be part of the read's column selection to be seen.
/// Rows without the column pass unless `filter_if_missing` is set.
#[derive(Debug, Clone)]
pub struct SingleColumnValueFilter {
    family: Vec<u8>,
    qualifier: Vec<u8>,
    op: CompareOp,
    comparator: Comparator,
    filter_if_missing: bool,
    found_column: bool,
    matched_column: bool,
}

impl SingleColumnValueFilter {
    pub fn new(
        family: impl Into<Vec<u8>>,
        qualifier: impl Into<Vec<u8>>,
        op: CompareOp,
        comparator: Comparator,
    ) -> Self {
        Self {
            family: family.into(),
            qualifier: qualifier.into(),
            op,
            comparator,
            filter_if_missing: false,
            found_column: false,
            matched_column: false,
        }
    }

    /// Drop rows that lack the column entirely.
    pub fn filter_if_missing(mut self, filter_if_missing: bool) -> Self {
        self.filter_if_missing = filter_if_missing;
        self
    }
}

impl Filter for SingleColumnValueFilter {
    fn reset(&mut self) {
        self.found_column = false;
        self.matched_column = false;
    }

    fn filter_cell(&mut self, cell: &Cell) -> ReturnCode {
        if !cell.matches_column(&self.family, &self.qualifier) || self.found_column {
            return ReturnCode::Include;
        }

        // latest version of the tested column
        self.found_column = true;
        self.matched_column = self.comparator.matches(self.op, cell.value());
        if self.matched_column {
            ReturnCode::Include
        } else {
            ReturnCode::NextRow
        }
    }

    fn has_filter_row(&self) -> bool {
        true
    }

    fn filter_row(&mut self) -> bool {
        if self.found_column {
            !self.matched_column
        } else {
            self.filter_if_missing
        }
    }
}
