//! RowRecord - all stored versions of one row
//!
//! Versions are keyed by an explicit composite `ColumnKey` (family,
//! qualifier) rather than nested family and qualifier maps. A family exists
//! in a row exactly as long as one of its columns holds a version, and a
//! column is dropped as soon as its last version goes.

use std::collections::BTreeMap;

use super::{Cell, Columns, TimeRange, Timestamp};

/// Composite column address. Orders by family, then qualifier.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ColumnKey {
    pub family: Vec<u8>,
    pub qualifier: Vec<u8>,
}

impl ColumnKey {
    pub fn new(family: impl Into<Vec<u8>>, qualifier: impl Into<Vec<u8>>) -> Self {
        Self {
            family: family.into(),
            qualifier: qualifier.into(),
        }
    }
}

/// Versions of one row, guarded by the row lock in `Table`.
#[derive(Debug, Default)]
pub(crate) struct RowRecord {
    columns: BTreeMap<ColumnKey, BTreeMap<Timestamp, Vec<u8>>>,
}

impl RowRecord {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub(crate) fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// Store a version. A value already at that timestamp is replaced.
    pub(crate) fn insert(&mut self, family: &[u8], qualifier: &[u8], ts: Timestamp, value: Vec<u8>) {
        self.columns
            .entry(ColumnKey::new(family, qualifier))
            .or_default()
            .insert(ts, value);
    }

    /// Latest version of a column.
    pub(crate) fn latest(&self, family: &[u8], qualifier: &[u8]) -> Option<(Timestamp, &[u8])> {
        self.columns
            .get(&ColumnKey::new(family, qualifier))
            .and_then(|versions| versions.iter().next_back())
            .map(|(ts, value)| (*ts, value.as_slice()))
    }

    pub(crate) fn clear(&mut self) {
        self.columns.clear();
    }

    pub(crate) fn remove_family(&mut self, family: &[u8]) {
        self.columns.retain(|key, _| key.family != family);
    }

    pub(crate) fn remove_column(&mut self, family: &[u8], qualifier: &[u8]) {
        self.columns.remove(&ColumnKey::new(family, qualifier));
    }

    pub(crate) fn remove_version(&mut self, family: &[u8], qualifier: &[u8], ts: Timestamp) {
        let key = ColumnKey::new(family, qualifier);
        let now_empty = match self.columns.get_mut(&key) {
            Some(versions) => {
                versions.remove(&ts);
                versions.is_empty()
            }
            None => false,
        };
        if now_empty {
            self.columns.remove(&key);
        }
    }

    /// Materialize the selected cells.
    ///
    /// Cells come out ordered by family, qualifier, then descending
    /// timestamp. At most `max_versions` versions inside `range` are
    /// returned per column.
    pub(crate) fn cells(
        &self,
        row: &[u8],
        columns: &Columns,
        range: &TimeRange,
        max_versions: usize,
    ) -> Vec<Cell> {
        let mut out = Vec::new();
        for (key, versions) in &self.columns {
            if !columns.contains(&key.family, &key.qualifier) {
                continue;
            }
            let selected = versions
                .iter()
                .rev()
                .filter(|(ts, _)| range.contains(**ts))
                .take(max_versions);
            for (ts, value) in selected {
                out.push(Cell::new(
                    row.to_vec(),
                    key.family.clone(),
                    key.qualifier.clone(),
                    *ts,
                    value.clone(),
                ));
            }
        }
        out
    }
}
