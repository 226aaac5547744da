//! Write requests
//!
//! Every mutation addresses exactly one row. A mutation is applied to that
//! row atomically: readers see all of it or none of it.

use super::{Get, RowResult, Timestamp};

/// One cell of a `Put`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PutCell {
    pub family: Vec<u8>,
    pub qualifier: Vec<u8>,
    /// `Timestamp::LATEST` until the table assigns one
    pub timestamp: Timestamp,
    pub value: Vec<u8>,
}

/// Insert of one or more cells into one row.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Put {
    pub(crate) row: Vec<u8>,
    pub(crate) cells: Vec<PutCell>,
}

impl Put {
    pub fn new(row: impl Into<Vec<u8>>) -> Self {
        Self {
            row: row.into(),
            cells: Vec::new(),
        }
    }

    /// Add a cell stamped at write time.
    pub fn add_column(
        self,
        family: impl Into<Vec<u8>>,
        qualifier: impl Into<Vec<u8>>,
        value: impl Into<Vec<u8>>,
    ) -> Self {
        self.add_column_at(family, qualifier, Timestamp::LATEST, value)
    }

    /// Add a cell with an explicit timestamp.
    ///
    /// `Timestamp::LATEST` (`u64::MAX`) is not a storable version: a cell
    /// given it is stamped at write time like `add_column`. The greatest
    /// storable timestamp is `Timestamp::MAX`.
    pub fn add_column_at(
        mut self,
        family: impl Into<Vec<u8>>,
        qualifier: impl Into<Vec<u8>>,
        timestamp: Timestamp,
        value: impl Into<Vec<u8>>,
    ) -> Self {
        self.cells.push(PutCell {
            family: family.into(),
            qualifier: qualifier.into(),
            timestamp,
            value: value.into(),
        });
        self
    }

    pub fn row(&self) -> &[u8] {
        &self.row
    }

    pub fn cells(&self) -> &[PutCell] {
        &self.cells
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }
}

/// What a `Delete` removes.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DeleteTarget {
    /// Every column of a family
    Family(Vec<u8>),
    /// Every version of one column
    Column { family: Vec<u8>, qualifier: Vec<u8> },
    /// One version of one column
    Version {
        family: Vec<u8>,
        qualifier: Vec<u8>,
        timestamp: Timestamp,
    },
}

/// Removal of data from one row.
///
/// A delete with no targets removes the whole row.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Delete {
    pub(crate) row: Vec<u8>,
    pub(crate) targets: Vec<DeleteTarget>,
}

impl Delete {
    pub fn new(row: impl Into<Vec<u8>>) -> Self {
        Self {
            row: row.into(),
            targets: Vec::new(),
        }
    }

    pub fn family(mut self, family: impl Into<Vec<u8>>) -> Self {
        self.targets.push(DeleteTarget::Family(family.into()));
        self
    }

    pub fn column(mut self, family: impl Into<Vec<u8>>, qualifier: impl Into<Vec<u8>>) -> Self {
        self.targets.push(DeleteTarget::Column {
            family: family.into(),
            qualifier: qualifier.into(),
        });
        self
    }

    pub fn version(
        mut self,
        family: impl Into<Vec<u8>>,
        qualifier: impl Into<Vec<u8>>,
        timestamp: Timestamp,
    ) -> Self {
        self.targets.push(DeleteTarget::Version {
            family: family.into(),
            qualifier: qualifier.into(),
            timestamp,
        });
        self
    }

    pub fn row(&self) -> &[u8] {
        &self.row
    }

    pub fn targets(&self) -> &[DeleteTarget] {
        &self.targets
    }

    /// True if this delete removes the whole row.
    pub fn is_whole_row(&self) -> bool {
        self.targets.is_empty()
    }
}

/// Atomic add to a column holding a big-endian i64.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Increment {
    pub(crate) row: Vec<u8>,
    pub(crate) family: Vec<u8>,
    pub(crate) qualifier: Vec<u8>,
    pub(crate) delta: i64,
}

impl Increment {
    pub fn new(
        row: impl Into<Vec<u8>>,
        family: impl Into<Vec<u8>>,
        qualifier: impl Into<Vec<u8>>,
        delta: i64,
    ) -> Self {
        Self {
            row: row.into(),
            family: family.into(),
            qualifier: qualifier.into(),
            delta,
        }
    }

    pub fn row(&self) -> &[u8] {
        &self.row
    }
}

/// Byte append to a column.
///
/// Accepted in batches for interface compatibility. Executing it fails with
/// `UnsupportedOperation`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Append {
    pub(crate) row: Vec<u8>,
    pub(crate) family: Vec<u8>,
    pub(crate) qualifier: Vec<u8>,
    pub(crate) value: Vec<u8>,
}

impl Append {
    pub fn new(
        row: impl Into<Vec<u8>>,
        family: impl Into<Vec<u8>>,
        qualifier: impl Into<Vec<u8>>,
        value: impl Into<Vec<u8>>,
    ) -> Self {
        Self {
            row: row.into(),
            family: family.into(),
            qualifier: qualifier.into(),
            value: value.into(),
        }
    }

    pub fn row(&self) -> &[u8] {
        &self.row
    }

    pub fn family(&self) -> &[u8] {
        &self.family
    }

    pub fn qualifier(&self) -> &[u8] {
        &self.qualifier
    }

    pub fn value(&self) -> &[u8] {
        &self.value
    }
}

/// A single-row mutation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Mutation {
    Put(Put),
    Delete(Delete),
    Increment(Increment),
}

impl Mutation {
    pub fn row(&self) -> &[u8] {
        match self {
            Mutation::Put(put) => put.row(),
            Mutation::Delete(delete) => delete.row(),
            Mutation::Increment(increment) => increment.row(),
        }
    }
}

impl From<Put> for Mutation {
    fn from(put: Put) -> Self {
        Mutation::Put(put)
    }
}

impl From<Delete> for Mutation {
    fn from(delete: Delete) -> Self {
        Mutation::Delete(delete)
    }
}

/// An ordered list of mutations applied to one row as a unit.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RowMutations {
    pub(crate) row: Vec<u8>,
    pub(crate) mutations: Vec<Mutation>,
}

impl RowMutations {
    pub fn new(row: impl Into<Vec<u8>>) -> Self {
        Self {
            row: row.into(),
            mutations: Vec::new(),
        }
    }

    pub fn add(mut self, mutation: impl Into<Mutation>) -> Self {
        self.mutations.push(mutation.into());
        self
    }

    pub fn row(&self) -> &[u8] {
        &self.row
    }

    pub fn mutations(&self) -> &[Mutation] {
        &self.mutations
    }
}

/// One entry of a batch.
#[derive(Debug)]
pub enum Action {
    Get(Get),
    Put(Put),
    Delete(Delete),
    Increment(Increment),
    Append(Append),
}

/// Outcome of one successful batch entry.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ActionResult {
    /// Result of a `Get`
    Row(RowResult),
    /// A `Put` or `Delete` was applied
    Applied,
    /// New value of an `Increment`
    Value(i64),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_put_defaults_to_latest_timestamp() {
        let put = Put::new("row").add_column("f", "q", "v");
        assert_eq!(put.cells().len(), 1);
        assert!(put.cells()[0].timestamp.is_latest());
    }

    #[test]
    fn test_put_explicit_timestamp() {
        let put = Put::new("row").add_column_at("f", "q", Timestamp::new(42), "v");
        assert_eq!(put.cells()[0].timestamp, Timestamp::new(42));
    }

    #[test]
    fn test_delete_without_targets_is_whole_row() {
        assert!(Delete::new("row").is_whole_row());
        assert!(!Delete::new("row").column("f", "q").is_whole_row());
    }

    #[test]
    fn test_row_mutations_keep_order() {
        let mutations = RowMutations::new("row")
            .add(Put::new("row").add_column("f", "a", "1"))
            .add(Delete::new("row").column("f", "b"));

        assert_eq!(mutations.mutations().len(), 2);
        assert!(matches!(mutations.mutations()[0], Mutation::Put(_)));
        assert!(matches!(mutations.mutations()[1], Mutation::Delete(_)));
    }
}
