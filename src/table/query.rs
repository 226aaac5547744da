//! Read requests: column selection, time ranges, `Get` and `Scan`

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use super::Timestamp;
use crate::filter::Filter;

/// Half-open timestamp interval `[min, max)`.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct TimeRange {
    min: Timestamp,
    max: Timestamp,
}

impl TimeRange {
    /// Every storable timestamp.
    pub fn all() -> Self {
        Self {
            min: Timestamp::MIN,
            max: Timestamp::LATEST,
        }
    }

    /// Versions with `min <= ts < max`.
    pub fn between(min: Timestamp, max: Timestamp) -> Self {
        Self { min, max }
    }

    /// Exactly one timestamp.
    pub fn at(ts: Timestamp) -> Self {
        Self {
            min: ts,
            max: Timestamp::new(ts.as_u64().saturating_add(1)),
        }
    }

    #[inline]
    pub fn contains(&self, ts: Timestamp) -> bool {
        ts >= self.min && ts < self.max
    }

    pub fn min(&self) -> Timestamp {
        self.min
    }

    pub fn max(&self) -> Timestamp {
        self.max
    }
}

impl Default for TimeRange {
    fn default() -> Self {
        Self::all()
    }
}

/// Which columns a read returns.
///
/// Empty selection means every family. A family selected with no qualifiers
/// means every qualifier of that family.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Columns {
    families: BTreeMap<Vec<u8>, BTreeSet<Vec<u8>>>,
}

impl Columns {
    pub fn all() -> Self {
        Self::default()
    }

    /// Select a whole family.
    pub fn add_family(&mut self, family: impl Into<Vec<u8>>) {
        // a whole-family selection subsumes any qualifiers added before
        self.families.insert(family.into(), BTreeSet::new());
    }

    /// Select one column.
    pub fn add_column(&mut self, family: impl Into<Vec<u8>>, qualifier: impl Into<Vec<u8>>) {
        let family = family.into();
        match self.families.get_mut(&family) {
            // already whole-family
            Some(qualifiers) if qualifiers.is_empty() => {}
            Some(qualifiers) => {
                qualifiers.insert(qualifier.into());
            }
            None => {
                let mut qualifiers = BTreeSet::new();
                qualifiers.insert(qualifier.into());
                self.families.insert(family, qualifiers);
            }
        }
    }

    #[inline]
    pub fn is_all(&self) -> bool {
        self.families.is_empty()
    }

    /// True if the column is part of the selection.
    pub fn contains(&self, family: &[u8], qualifier: &[u8]) -> bool {
        if self.families.is_empty() {
            return true;
        }
        match self.families.get(family) {
            Some(qualifiers) => qualifiers.is_empty() || qualifiers.contains(qualifier),
            None => false,
        }
    }
}

/// Point read of one row.
pub struct Get {
    pub(crate) row: Vec<u8>,
    pub(crate) columns: Columns,
    pub(crate) time_range: TimeRange,
    pub(crate) max_versions: Option<usize>,
    pub(crate) filter: Option<Box<dyn Filter>>,
}

impl Get {
    pub fn new(row: impl Into<Vec<u8>>) -> Self {
        Self {
            row: row.into(),
            columns: Columns::all(),
            time_range: TimeRange::all(),
            max_versions: None,
            filter: None,
        }
    }

    pub fn add_family(mut self, family: impl Into<Vec<u8>>) -> Self {
        self.columns.add_family(family);
        self
    }

    pub fn add_column(mut self, family: impl Into<Vec<u8>>, qualifier: impl Into<Vec<u8>>) -> Self {
        self.columns.add_column(family, qualifier);
        self
    }

    pub fn time_range(mut self, range: TimeRange) -> Self {
        self.time_range = range;
        self
    }

    /// Versions returned per column. Defaults to the table's `max_versions`.
    pub fn max_versions(mut self, versions: usize) -> Self {
        self.max_versions = Some(versions);
        self
    }

    pub fn filter(mut self, filter: impl Filter + 'static) -> Self {
        self.filter = Some(Box::new(filter));
        self
    }

    pub fn row(&self) -> &[u8] {
        &self.row
    }
}

impl fmt::Debug for Get {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Get")
            .field("row", &String::from_utf8_lossy(&self.row))
            .field("columns", &self.columns)
            .field("time_range", &self.time_range)
            .field("max_versions", &self.max_versions)
            .field("filter", &self.filter)
            .finish()
    }
}

/// Range read over rows in key order.
///
/// `start_row` is inclusive, `stop_row` exclusive. When both are set and
/// equal, that single row is scanned.
pub struct Scan {
    pub(crate) start_row: Option<Vec<u8>>,
    pub(crate) stop_row: Option<Vec<u8>>,
    pub(crate) columns: Columns,
    pub(crate) time_range: TimeRange,
    pub(crate) max_versions: Option<usize>,
    pub(crate) filter: Option<Box<dyn Filter>>,
}

impl Scan {
    pub fn new() -> Self {
        Self {
            start_row: None,
            stop_row: None,
            columns: Columns::all(),
            time_range: TimeRange::all(),
            max_versions: None,
            filter: None,
        }
    }

    pub fn start_row(mut self, row: impl Into<Vec<u8>>) -> Self {
        self.start_row = Some(row.into());
        self
    }

    pub fn stop_row(mut self, row: impl Into<Vec<u8>>) -> Self {
        self.stop_row = Some(row.into());
        self
    }

    pub fn add_family(mut self, family: impl Into<Vec<u8>>) -> Self {
        self.columns.add_family(family);
        self
    }

    pub fn add_column(mut self, family: impl Into<Vec<u8>>, qualifier: impl Into<Vec<u8>>) -> Self {
        self.columns.add_column(family, qualifier);
        self
    }

    pub fn time_range(mut self, range: TimeRange) -> Self {
        self.time_range = range;
        self
    }

    pub fn max_versions(mut self, versions: usize) -> Self {
        self.max_versions = Some(versions);
        self
    }

    pub fn filter(mut self, filter: impl Filter + 'static) -> Self {
        self.filter = Some(Box::new(filter));
        self
    }
}

impl Default for Scan {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Scan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Scan")
            .field("start_row", &self.start_row.as_deref().map(String::from_utf8_lossy))
            .field("stop_row", &self.stop_row.as_deref().map(String::from_utf8_lossy))
            .field("columns", &self.columns)
            .field("time_range", &self.time_range)
            .field("max_versions", &self.max_versions)
            .field("filter", &self.filter)
            .finish()
    }
}
