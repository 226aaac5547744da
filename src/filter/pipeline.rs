//! Filter protocol and the per-row evaluation pipeline
//!
//! # Evaluation order (per row)
//!
//! 1. `reset`
//! 2. `filter_row_key` - exclusion drops the row, no cell is evaluated
//! 3. `filter_cell` for each candidate cell (family, qualifier, descending
//!    timestamp)
//! 4. `filter_row_cells` then `filter_row`, only for filters declaring
//!    `has_filter_row` and only when some cell survived step 3
//! 5. `filter_all_remaining` after the row, to end the scan early
//!
//! Seek hints are an optimization and are treated as a plain skip.

use std::fmt;

use crate::table::Cell;

/// Per-cell decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReturnCode {
    /// Keep the cell
    Include,
    /// Drop this cell, continue with the next one
    Skip,
    /// Drop this cell and the remaining versions of its column
    NextColumn,
    /// Drop this cell and every remaining cell of the row
    NextRow,
    /// Drop this cell; the filter knows a better next position
    SeekNextUsingHint,
}

/// A server-side filter.
///
/// Every hook has a permissive default, so a filter only implements the
/// capabilities it uses. Filters may keep state; `reset` is called before
/// every row.
pub trait Filter: Send + fmt::Debug {
    /// Clear per-row state.
    fn reset(&mut self) {}

    /// Return true to exclude the whole row based on its key.
    fn filter_row_key(&mut self, _row: &[u8]) -> bool {
        false
    }

    /// Decide the fate of one cell.
    fn filter_cell(&mut self, _cell: &Cell) -> ReturnCode {
        ReturnCode::Include
    }

    /// True if the filter wants to see the included cells of each row.
    fn has_filter_row(&self) -> bool {
        false
    }

    /// Inspect and possibly rewrite the included cells of a row.
    fn filter_row_cells(&mut self, _cells: &mut Vec<Cell>) {}

    /// Return true to exclude the row after `filter_row_cells`.
    fn filter_row(&mut self) -> bool {
        false
    }

    /// Return true once no later row can pass; the scan stops.
    fn filter_all_remaining(&self) -> bool {
        false
    }
}

impl<F: Filter + ?Sized> Filter for Box<F> {
    fn reset(&mut self) {
        (**self).reset()
    }

    fn filter_row_key(&mut self, row: &[u8]) -> bool {
        (**self).filter_row_key(row)
    }

    fn filter_cell(&mut self, cell: &Cell) -> ReturnCode {
        (**self).filter_cell(cell)
    }

    fn has_filter_row(&self) -> bool {
        (**self).has_filter_row()
    }

    fn filter_row_cells(&mut self, cells: &mut Vec<Cell>) {
        (**self).filter_row_cells(cells)
    }

    fn filter_row(&mut self) -> bool {
        (**self).filter_row()
    }

    fn filter_all_remaining(&self) -> bool {
        (**self).filter_all_remaining()
    }
}

/// Run one row's cells through a filter.
///
/// Returns the cells that survive. An empty result means the row is
/// excluded.
pub fn apply_filter(filter: &mut dyn Filter, row: &[u8], cells: Vec<Cell>) -> Vec<Cell> {
    filter.reset();

    if filter.filter_row_key(row) {
        return Vec::new();
    }

    let mut included = Vec::with_capacity(cells.len());
    let mut skipped_column: Option<Cell> = None;

    for cell in cells {
        if let Some(skipped) = &skipped_column {
            if skipped.same_column(&cell) {
                continue;
            }
            skipped_column = None;
        }

        match filter.filter_cell(&cell) {
            ReturnCode::Include => included.push(cell),
            ReturnCode::Skip | ReturnCode::SeekNextUsingHint => {}
            ReturnCode::NextColumn => skipped_column = Some(cell),
            ReturnCode::NextRow => break,
        }
    }

    if included.is_empty() {
        return included;
    }

    if filter.has_filter_row() {
        filter.filter_row_cells(&mut included);
        if filter.filter_row() {
            included.clear();
        }
    }

    included
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::Timestamp;

    fn cell(qualifier: &str, ts: u64) -> Cell {
        Cell::new(
            b"row".to_vec(),
            b"f".to_vec(),
            qualifier.as_bytes().to_vec(),
            Timestamp::new(ts),
            b"v".to_vec(),
        )
    }

    fn row_cells() -> Vec<Cell> {
        vec![cell("a", 3), cell("a", 2), cell("a", 1), cell("b", 5), cell("c", 4)]
    }

    /// Scripted filter returning a fixed decision per qualifier.
    #[derive(Debug, Default)]
    struct Scripted {
        exclude_row: bool,
        on_a: Option<ReturnCode>,
        on_b: Option<ReturnCode>,
        whole_row: bool,
        reject_row: bool,
        resets: usize,
        cells_seen: usize,
    }

    impl Filter for Scripted {
        fn reset(&mut self) {
            self.resets += 1;
        }

        fn filter_row_key(&mut self, _row: &[u8]) -> bool {
            self.exclude_row
        }

        fn filter_cell(&mut self, cell: &Cell) -> ReturnCode {
            self.cells_seen += 1;
            match cell.qualifier() {
                b"a" => self.on_a.unwrap_or(ReturnCode::Include),
                b"b" => self.on_b.unwrap_or(ReturnCode::Include),
                _ => ReturnCode::Include,
            }
        }

        fn has_filter_row(&self) -> bool {
            self.whole_row
        }

        fn filter_row_cells(&mut self, cells: &mut Vec<Cell>) {
            cells.retain(|c| c.qualifier() != b"c");
        }

        fn filter_row(&mut self) -> bool {
            self.reject_row
        }
    }

    fn qualifiers(cells: &[Cell]) -> Vec<(String, u64)> {
        cells
            .iter()
            .map(|c| {
                (
                    String::from_utf8_lossy(c.qualifier()).into_owned(),
                    c.timestamp().as_u64(),
                )
            })
            .collect()
    }

    #[test]
    fn test_row_key_exclusion_skips_cells() {
        let mut filter = Scripted {
            exclude_row: true,
            ..Default::default()
        };
        let out = apply_filter(&mut filter, b"row", row_cells());
        assert!(out.is_empty());
        assert_eq!(filter.cells_seen, 0);
        assert_eq!(filter.resets, 1);
    }

    #[test]
    fn test_include_everything() {
        let mut filter = Scripted::default();
        let out = apply_filter(&mut filter, b"row", row_cells());
        assert_eq!(out.len(), 5);
    }

    #[test]
    fn test_skip_drops_single_cell() {
        let mut filter = Scripted {
            on_b: Some(ReturnCode::Skip),
            ..Default::default()
        };
        let out = apply_filter(&mut filter, b"row", row_cells());
        assert_eq!(
            qualifiers(&out),
            vec![
                ("a".into(), 3),
                ("a".into(), 2),
                ("a".into(), 1),
                ("c".into(), 4)
            ]
        );
    }

    #[test]
    fn test_next_column_skips_remaining_versions() {
        let mut filter = Scripted {
            on_a: Some(ReturnCode::NextColumn),
            ..Default::default()
        };
        let out = apply_filter(&mut filter, b"row", row_cells());
        assert_eq!(qualifiers(&out), vec![("b".into(), 5), ("c".into(), 4)]);
        // only the first version of column a reached the filter
        assert_eq!(filter.cells_seen, 3);
    }

    #[test]
    fn test_next_row_short_circuits() {
        let mut filter = Scripted {
            on_b: Some(ReturnCode::NextRow),
            ..Default::default()
        };
        let out = apply_filter(&mut filter, b"row", row_cells());
        assert_eq!(out.len(), 3);
        assert_eq!(filter.cells_seen, 4);
    }

    #[test]
    fn test_seek_hint_is_a_skip() {
        let mut filter = Scripted {
            on_b: Some(ReturnCode::SeekNextUsingHint),
            ..Default::default()
        };
        let out = apply_filter(&mut filter, b"row", row_cells());
        assert_eq!(out.len(), 4);
    }

    #[test]
    fn test_whole_row_hook_can_mutate() {
        let mut filter = Scripted {
            whole_row: true,
            ..Default::default()
        };
        let out = apply_filter(&mut filter, b"row", row_cells());
        assert!(out.iter().all(|c| c.qualifier() != b"c"));
        assert_eq!(out.len(), 4);
    }

    #[test]
    fn test_whole_row_hook_can_reject() {
        let mut filter = Scripted {
            whole_row: true,
            reject_row: true,
            ..Default::default()
        };
        assert!(apply_filter(&mut filter, b"row", row_cells()).is_empty());
    }

    #[test]
    fn test_row_hooks_ignored_without_declaration() {
        let mut filter = Scripted {
            reject_row: true,
            ..Default::default()
        };
        assert_eq!(apply_filter(&mut filter, b"row", row_cells()).len(), 5);
    }
}
