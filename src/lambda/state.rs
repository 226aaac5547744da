//! Per-row classification
//!
//! The state of a row is derived from the latest BULK and REALTIME cells
//! every time it is needed. Nothing about it is stored.

use std::fmt;

use serde::Serialize;

use super::{LambdaError, LambdaResult, BULK, FAMILY, REALTIME};
use crate::table::{Cell, Delete, Mutation, Put, RowResult, Timestamp};

/// Which of the two reconciliation columns are present, and how they relate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RowState {
    /// Neither column present
    Empty,
    /// Only BULK present
    BulkOnly,
    /// Only REALTIME present
    RealtimeOnly,
    /// Both present, REALTIME strictly newer
    BothConsistent,
    /// Both present, BULK at least as new as REALTIME
    BothAnomalous,
}

impl RowState {
    /// Classify from the latest timestamp of each column.
    pub fn classify(bulk: Option<Timestamp>, realtime: Option<Timestamp>) -> Self {
        match (bulk, realtime) {
            (None, None) => RowState::Empty,
            (Some(_), None) => RowState::BulkOnly,
            (None, Some(_)) => RowState::RealtimeOnly,
            (Some(bulk), Some(realtime)) if realtime > bulk => RowState::BothConsistent,
            (Some(_), Some(_)) => RowState::BothAnomalous,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RowState::Empty => "EMPTY",
            RowState::BulkOnly => "BULK_ONLY",
            RowState::RealtimeOnly => "REALTIME_ONLY",
            RowState::BothConsistent => "BOTH_CONSISTENT",
            RowState::BothAnomalous => "BOTH_ANOMALOUS",
        }
    }
}

impl fmt::Display for RowState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// What cleanup does to a row
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CleanupAction {
    /// Copy REALTIME into BULK and delete REALTIME
    Promote,
    /// Delete REALTIME, keep BULK
    DiscardRealtime,
    /// Leave the row alone
    Keep,
}

impl From<RowState> for CleanupAction {
    fn from(state: RowState) -> Self {
        match state {
            RowState::RealtimeOnly | RowState::BothConsistent => CleanupAction::Promote,
            RowState::BothAnomalous => CleanupAction::DiscardRealtime,
            RowState::BulkOnly | RowState::Empty => CleanupAction::Keep,
        }
    }
}

/// Latest BULK and REALTIME cells of one row, read together.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LambdaRow {
    row: Vec<u8>,
    key: String,
    bulk: Option<Cell>,
    realtime: Option<Cell>,
}

impl LambdaRow {
    /// Extract both columns from a row read.
    pub fn from_result(result: &RowResult) -> Self {
        Self {
            row: result.row().to_vec(),
            key: String::from_utf8_lossy(result.row()).into_owned(),
            bulk: result.latest_cell(FAMILY, BULK).cloned(),
            realtime: result.latest_cell(FAMILY, REALTIME).cloned(),
        }
    }

    /// Row key as written, used to address the row.
    #[inline]
    pub fn row_key(&self) -> &[u8] {
        &self.row
    }

    /// Row key for display; invalid UTF-8 is replaced.
    #[inline]
    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn bulk(&self) -> Option<&Cell> {
        self.bulk.as_ref()
    }

    pub fn realtime(&self) -> Option<&Cell> {
        self.realtime.as_ref()
    }

    pub fn state(&self) -> RowState {
        RowState::classify(
            self.bulk.as_ref().map(Cell::timestamp),
            self.realtime.as_ref().map(Cell::timestamp),
        )
    }

    /// The value a reader should see.
    ///
    /// REALTIME wins when it is newer, BULK is used when it is alone. An
    /// anomalous row is an error here even though cleanup resolves it.
    pub fn combined(&self) -> LambdaResult<String> {
        match (&self.bulk, &self.realtime) {
            (None, None) => Err(LambdaError::not_found(&self.key, "value")),
            (Some(bulk), None) => Ok(bulk.value_lossy()),
            (None, Some(realtime)) => Ok(realtime.value_lossy()),
            (Some(bulk), Some(realtime)) if realtime.timestamp() > bulk.timestamp() => {
                Ok(realtime.value_lossy())
            }
            (Some(bulk), Some(realtime)) => Err(LambdaError::InvariantViolation {
                key: self.key.clone(),
                bulk_ts: bulk.timestamp(),
                realtime_ts: realtime.timestamp(),
            }),
        }
    }

    /// Mutations that reconcile this row, applied as one row mutation.
    ///
    /// A promoted value keeps the REALTIME timestamp, so it stays newer than
    /// every BULK version it supersedes.
    pub fn cleanup_mutations(&self) -> (CleanupAction, Vec<Mutation>) {
        let action = CleanupAction::from(self.state());
        let key = self.row.as_slice();
        let drop_realtime = || Mutation::Delete(Delete::new(key).column(FAMILY, REALTIME));

        let mutations = match (action, &self.realtime) {
            (CleanupAction::Promote, Some(realtime)) => vec![
                Mutation::Put(Put::new(key).add_column_at(
                    FAMILY,
                    BULK,
                    realtime.timestamp(),
                    realtime.value(),
                )),
                drop_realtime(),
            ],
            (CleanupAction::DiscardRealtime, _) => vec![drop_realtime()],
            _ => Vec::new(),
        };
        (action, mutations)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ts(millis: u64) -> Timestamp {
        Timestamp::new(millis)
    }

    fn cell(qualifier: &[u8], at: u64, value: &str) -> Cell {
        Cell::new(
            b"k".to_vec(),
            FAMILY.to_vec(),
            qualifier.to_vec(),
            ts(at),
            value.as_bytes().to_vec(),
        )
    }

    fn row(bulk: Option<(u64, &str)>, realtime: Option<(u64, &str)>) -> LambdaRow {
        let mut cells = Vec::new();
        if let Some((at, value)) = bulk {
            cells.push(cell(BULK, at, value));
        }
        if let Some((at, value)) = realtime {
            cells.push(cell(REALTIME, at, value));
        }
        LambdaRow::from_result(&RowResult::new(b"k".to_vec(), cells))
    }

    #[test]
    fn test_classify() {
        assert_eq!(RowState::classify(None, None), RowState::Empty);
        assert_eq!(RowState::classify(Some(ts(1)), None), RowState::BulkOnly);
        assert_eq!(RowState::classify(None, Some(ts(1))), RowState::RealtimeOnly);
        assert_eq!(
            RowState::classify(Some(ts(1)), Some(ts(2))),
            RowState::BothConsistent
        );
        assert_eq!(
            RowState::classify(Some(ts(2)), Some(ts(1))),
            RowState::BothAnomalous
        );
        // equal timestamps are anomalous
        assert_eq!(
            RowState::classify(Some(ts(2)), Some(ts(2))),
            RowState::BothAnomalous
        );
    }

    #[test]
    fn test_combined_by_state() {
        assert!(row(None, None).combined().unwrap_err().is_not_found());
        assert_eq!(row(Some((1, "b")), None).combined().unwrap(), "b");
        assert_eq!(row(None, Some((1, "r"))).combined().unwrap(), "r");
        assert_eq!(row(Some((1, "b")), Some((2, "r"))).combined().unwrap(), "r");
        assert_eq!(
            row(Some((2, "b")), Some((1, "r"))).combined().unwrap_err().code(),
            "LS_INVARIANT_VIOLATION"
        );
    }

    #[test]
    fn test_cleanup_mutations() {
        let (action, mutations) = row(None, Some((7, "r"))).cleanup_mutations();
        assert_eq!(action, CleanupAction::Promote);
        assert_eq!(mutations.len(), 2);
        match &mutations[0] {
            Mutation::Put(put) => {
                assert_eq!(put.cells()[0].qualifier, BULK.to_vec());
                assert_eq!(put.cells()[0].timestamp, ts(7));
                assert_eq!(put.cells()[0].value, b"r".to_vec());
            }
            other => panic!("expected put, got {:?}", other),
        }

        let (action, mutations) = row(Some((9, "b")), Some((3, "r"))).cleanup_mutations();
        assert_eq!(action, CleanupAction::DiscardRealtime);
        assert_eq!(mutations.len(), 1);

        let (action, mutations) = row(Some((1, "b")), None).cleanup_mutations();
        assert_eq!(action, CleanupAction::Keep);
        assert!(mutations.is_empty());
    }

    #[test]
    fn test_cleanup_mutations_keep_raw_row_key() {
        let key = vec![0xff, 0xfe, b'k'];
        let realtime = Cell::new(
            key.clone(),
            FAMILY.to_vec(),
            REALTIME.to_vec(),
            ts(4),
            b"r".to_vec(),
        );
        let row = LambdaRow::from_result(&RowResult::new(key.clone(), vec![realtime]));

        assert_eq!(row.row_key(), key.as_slice());
        let (_, mutations) = row.cleanup_mutations();
        assert!(mutations.iter().all(|m| m.row() == key.as_slice()));
    }

    #[test]
    fn test_state_display() {
        assert_eq!(RowState::BothAnomalous.to_string(), "BOTH_ANOMALOUS");
    }
}
