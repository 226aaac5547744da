//! FilterList - combines filters with AND / OR semantics

use super::{Filter, ReturnCode};
use crate::table::Cell;

/// How the members of a `FilterList` are combined.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
    /// A cell or row passes only if every member passes it
    MustPassAll,
    /// A cell or row passes if any member passes it
    MustPassOne,
}

/// Ordered list of filters evaluated as one.
///
/// With `MustPassAll`, members are asked in order and the first one that
/// does not include a cell decides. With `MustPassOne`, every member that
/// still accepts the row is asked and the most permissive answer wins.
#[derive(Debug)]
pub struct FilterList {
    operator: Operator,
    filters: Vec<Box<dyn Filter>>,
    /// Members that rejected the current row key (`MustPassOne` only)
    row_excluded: Vec<bool>,
}

impl FilterList {
    pub fn new(operator: Operator) -> Self {
        Self {
            operator,
            filters: Vec::new(),
            row_excluded: Vec::new(),
        }
    }

    pub fn must_pass_all() -> Self {
        Self::new(Operator::MustPassAll)
    }

    pub fn must_pass_one() -> Self {
        Self::new(Operator::MustPassOne)
    }

    /// Append a member.
    pub fn add(mut self, filter: impl Filter + 'static) -> Self {
        self.filters.push(Box::new(filter));
        self.row_excluded.push(false);
        self
    }

    pub fn operator(&self) -> Operator {
        self.operator
    }

    pub fn len(&self) -> usize {
        self.filters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.filters.is_empty()
    }

    /// Members still voting on the current row.
    fn active(&mut self) -> impl Iterator<Item = &mut Box<dyn Filter>> {
        self.filters
            .iter_mut()
            .zip(self.row_excluded.iter())
            .filter(|(_, excluded)| !**excluded)
            .map(|(filter, _)| filter)
    }
}

/// Restrictiveness rank, most permissive first.
fn rank(code: ReturnCode) -> u8 {
    match code {
        ReturnCode::Include => 0,
        ReturnCode::Skip | ReturnCode::SeekNextUsingHint => 1,
        ReturnCode::NextColumn => 2,
        ReturnCode::NextRow => 3,
    }
}

impl Filter for FilterList {
    fn reset(&mut self) {
        for (filter, excluded) in self.filters.iter_mut().zip(self.row_excluded.iter_mut()) {
            filter.reset();
            *excluded = false;
        }
    }

    fn filter_row_key(&mut self, row: &[u8]) -> bool {
        if self.filters.is_empty() {
            return false;
        }

        // every member sees the key so stateful members stay in step
        for (filter, excluded) in self.filters.iter_mut().zip(self.row_excluded.iter_mut()) {
            *excluded = filter.filter_row_key(row);
        }

        match self.operator {
            Operator::MustPassAll => self.row_excluded.iter().any(|e| *e),
            Operator::MustPassOne => self.row_excluded.iter().all(|e| *e),
        }
    }

    fn filter_cell(&mut self, cell: &Cell) -> ReturnCode {
        match self.operator {
            Operator::MustPassAll => {
                for filter in self.filters.iter_mut() {
                    match filter.filter_cell(cell) {
                        ReturnCode::Include => {}
                        ReturnCode::SeekNextUsingHint => return ReturnCode::Skip,
                        other => return other,
                    }
                }
                ReturnCode::Include
            }
            Operator::MustPassOne => {
                let mut best: Option<ReturnCode> = None;
                for filter in self.active() {
                    let code = match filter.filter_cell(cell) {
                        ReturnCode::SeekNextUsingHint => ReturnCode::Skip,
                        other => other,
                    };
                    if best.map_or(true, |b| rank(code) < rank(b)) {
                        best = Some(code);
                    }
                }
                best.unwrap_or(ReturnCode::Include)
            }
        }
    }

    fn has_filter_row(&self) -> bool {
        self.filters.iter().any(|f| f.has_filter_row())
    }

    fn filter_row_cells(&mut self, cells: &mut Vec<Cell>) {
        for filter in self.active() {
            if filter.has_filter_row() {
                filter.filter_row_cells(cells);
            }
        }
    }

    fn filter_row(&mut self) -> bool {
        match self.operator {
            Operator::MustPassAll => self
                .filters
                .iter_mut()
                .any(|f| f.has_filter_row() && f.filter_row()),
            Operator::MustPassOne => {
                let mut all_reject = true;
                for filter in self.active() {
                    let reject = filter.has_filter_row() && filter.filter_row();
                    if !reject {
                        all_reject = false;
                    }
                }
                all_reject
            }
        }
    }

    fn filter_all_remaining(&self) -> bool {
        if self.filters.is_empty() {
            return false;
        }
        match self.operator {
            Operator::MustPassAll => self.filters.iter().any(|f| f.filter_all_remaining()),
            Operator::MustPassOne => self.filters.iter().all(|f| f.filter_all_remaining()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::{
        apply_filter, CompareOp, Comparator, FirstKeyOnlyFilter, PageFilter, PrefixFilter,
        QualifierFilter, ValueFilter,
    };
    use crate::table::Timestamp;

    fn cell(row: &str, qualifier: &str, value: &str) -> Cell {
        Cell::new(
            row.as_bytes().to_vec(),
            b"f".to_vec(),
            qualifier.as_bytes().to_vec(),
            Timestamp::new(1),
            value.as_bytes().to_vec(),
        )
    }

    fn row(key: &str) -> Vec<Cell> {
        vec![cell(key, "a", "x"), cell(key, "b", "y"), cell(key, "c", "x")]
    }

    fn qualifiers(cells: &[Cell]) -> Vec<String> {
        cells
            .iter()
            .map(|c| String::from_utf8_lossy(c.qualifier()).into_owned())
            .collect()
    }

    #[test]
    fn test_empty_list_passes_everything() {
        let mut all = FilterList::must_pass_all();
        assert_eq!(apply_filter(&mut all, b"r", row("r")).len(), 3);

        let mut one = FilterList::must_pass_one();
        assert_eq!(apply_filter(&mut one, b"r", row("r")).len(), 3);
        assert!(!one.filter_all_remaining());
    }

    #[test]
    fn test_must_pass_all_intersects() {
        let mut list = FilterList::must_pass_all()
            .add(ValueFilter::new(CompareOp::Equal, Comparator::binary("x")))
            .add(QualifierFilter::new(CompareOp::NotEqual, Comparator::binary("a")));
        let out = apply_filter(&mut list, b"r", row("r"));
        assert_eq!(qualifiers(&out), vec!["c"]);
    }

    #[test]
    fn test_must_pass_one_unions() {
        let mut list = FilterList::must_pass_one()
            .add(QualifierFilter::new(CompareOp::Equal, Comparator::binary("a")))
            .add(QualifierFilter::new(CompareOp::Equal, Comparator::binary("b")));
        let out = apply_filter(&mut list, b"r", row("r"));
        assert_eq!(qualifiers(&out), vec!["a", "b"]);
    }

    #[test]
    fn test_must_pass_all_row_key() {
        let mut list = FilterList::must_pass_all()
            .add(PrefixFilter::new("row"))
            .add(FirstKeyOnlyFilter::new());
        assert!(apply_filter(&mut list, b"other", row("other")).is_empty());
        assert_eq!(qualifiers(&apply_filter(&mut list, b"rowA", row("rowA"))), vec!["a"]);
    }

    #[test]
    fn test_must_pass_one_row_key_needs_one_member() {
        let mut list = FilterList::must_pass_one()
            .add(PrefixFilter::new("aaa"))
            .add(PrefixFilter::new("row"));
        assert_eq!(apply_filter(&mut list, b"rowA", row("rowA")).len(), 3);
        assert!(apply_filter(&mut list, b"zzz", row("zzz")).is_empty());
        assert!(list.filter_all_remaining());
    }

    #[test]
    fn test_must_pass_one_ignores_members_that_rejected_key() {
        // the prefix member rejects the key, so its opinion on cells is moot
        let mut list = FilterList::must_pass_one()
            .add(PrefixFilter::new("nomatch"))
            .add(QualifierFilter::new(CompareOp::Equal, Comparator::binary("b")));
        let out = apply_filter(&mut list, b"r", row("r"));
        assert_eq!(qualifiers(&out), vec!["b"]);
    }

    #[test]
    fn test_page_filter_inside_list() {
        let mut list = FilterList::must_pass_all()
            .add(ValueFilter::new(CompareOp::Equal, Comparator::binary("y")))
            .add(PageFilter::new(1));
        assert_eq!(apply_filter(&mut list, b"r1", row("r1")).len(), 1);
        assert!(list.filter_all_remaining());
    }
}
