//! Cell - materialized view of one stored version
//!
//! A cell is a projection of (row, family, qualifier, timestamp, value).
//! It is produced by reads and owns copies of its bytes; nothing in the
//! table references it afterwards.

use super::Timestamp;

/// One version of one column of one row.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Cell {
    row: Vec<u8>,
    family: Vec<u8>,
    qualifier: Vec<u8>,
    timestamp: Timestamp,
    value: Vec<u8>,
}

impl Cell {
    pub fn new(
        row: Vec<u8>,
        family: Vec<u8>,
        qualifier: Vec<u8>,
        timestamp: Timestamp,
        value: Vec<u8>,
    ) -> Self {
        Self {
            row,
            family,
            qualifier,
            timestamp,
            value,
        }
    }

    #[inline]
    pub fn row(&self) -> &[u8] {
        &self.row
    }

    #[inline]
    pub fn family(&self) -> &[u8] {
        &self.family
    }

    #[inline]
    pub fn qualifier(&self) -> &[u8] {
        &self.qualifier
    }

    #[inline]
    pub fn timestamp(&self) -> Timestamp {
        self.timestamp
    }

    #[inline]
    pub fn value(&self) -> &[u8] {
        &self.value
    }

    /// Consumes the cell, returning its value.
    pub fn into_value(self) -> Vec<u8> {
        self.value
    }

    /// Value decoded as UTF-8, with invalid sequences replaced.
    pub fn value_lossy(&self) -> String {
        String::from_utf8_lossy(&self.value).into_owned()
    }

    /// True if this cell belongs to the given column.
    #[inline]
    pub fn matches_column(&self, family: &[u8], qualifier: &[u8]) -> bool {
        self.family == family && self.qualifier == qualifier
    }

    /// True if both cells belong to the same column of the same row.
    #[inline]
    pub fn same_column(&self, other: &Cell) -> bool {
        self.row == other.row && self.family == other.family && self.qualifier == other.qualifier
    }
}

/// The cells read from a single row.
///
/// Cells are ordered by family, then qualifier, then descending timestamp.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RowResult {
    row: Vec<u8>,
    cells: Vec<Cell>,
}

impl RowResult {
    pub fn new(row: Vec<u8>, cells: Vec<Cell>) -> Self {
        Self { row, cells }
    }

    /// An empty result for the given row.
    pub fn empty(row: Vec<u8>) -> Self {
        Self {
            row,
            cells: Vec::new(),
        }
    }

    #[inline]
    pub fn row(&self) -> &[u8] {
        &self.row
    }

    #[inline]
    pub fn cells(&self) -> &[Cell] {
        &self.cells
    }

    pub fn into_cells(self) -> Vec<Cell> {
        self.cells
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    /// Latest cell of a column, if the result holds any version of it.
    pub fn latest_cell(&self, family: &[u8], qualifier: &[u8]) -> Option<&Cell> {
        // descending timestamp order puts the latest version first
        self.cells
            .iter()
            .find(|cell| cell.matches_column(family, qualifier))
    }

    /// Value of the latest cell of a column.
    pub fn value(&self, family: &[u8], qualifier: &[u8]) -> Option<&[u8]> {
        self.latest_cell(family, qualifier).map(Cell::value)
    }

    /// All versions of a column held by this result, latest first.
    pub fn column_cells<'a>(
        &'a self,
        family: &'a [u8],
        qualifier: &'a [u8],
    ) -> impl Iterator<Item = &'a Cell> + 'a {
        self.cells
            .iter()
            .filter(move |cell| cell.matches_column(family, qualifier))
    }
}
