//! LambdaTable - reconciliation over a versioned table

use std::fmt::Write as _;
use std::sync::Arc;

use super::{
    CleanupAction, CleanupReport, Column, LambdaError, LambdaResult, LambdaRow, RowState, BULK,
    FAMILY, REALTIME,
};
use crate::config::StoreConfig;
use crate::observability::{log_event_with_fields, Event, MetricsRegistry, ObservationScope};
use crate::table::{Cell, Get, Put, Scan, Table, TableError, Timestamp};

const DUMP_HEADER: &str = "key\tbulk\trealtime\tcombined\n";
const DUMP_RULE_WIDTH: usize = 40;

/// Realtime/bulk view of a table.
///
/// Holds no state of its own. Any number of `LambdaTable`s may share one
/// `Table`; every operation goes through the table's row-level atomicity.
#[derive(Debug, Clone)]
pub struct LambdaTable {
    table: Arc<Table>,
}

impl LambdaTable {
    /// Wrap an existing table. The table must declare the `f` family.
    pub fn new(table: Arc<Table>) -> LambdaResult<Self> {
        let families = table.families()?;
        if !families.iter().any(|family| family.as_slice() == FAMILY) {
            return Err(TableError::unknown_family(FAMILY).into());
        }
        Ok(Self { table })
    }

    /// A fresh in-memory table with the default layout.
    pub fn in_memory() -> Self {
        Self {
            table: Arc::new(Table::with_config(&StoreConfig::lambda_default())),
        }
    }

    #[inline]
    pub fn table(&self) -> &Arc<Table> {
        &self.table
    }

    #[inline]
    pub fn metrics(&self) -> &Arc<MetricsRegistry> {
        self.table.metrics()
    }

    // ==================================================================
    // Writes
    // ==================================================================

    /// Store a batch-layer value, stamped now.
    pub fn push_bulk(&self, key: &str, value: &str) -> LambdaResult<()> {
        self.push(key, Column::Bulk, Timestamp::LATEST, value)
    }

    /// Store a speed-layer value, stamped now.
    pub fn push_realtime(&self, key: &str, value: &str) -> LambdaResult<()> {
        self.push(key, Column::Realtime, Timestamp::LATEST, value)
    }

    /// Store a batch-layer value with an explicit timestamp.
    pub fn push_bulk_at(&self, key: &str, value: &str, ts: Timestamp) -> LambdaResult<()> {
        self.push(key, Column::Bulk, ts, value)
    }

    /// Store a speed-layer value with an explicit timestamp.
    pub fn push_realtime_at(&self, key: &str, value: &str, ts: Timestamp) -> LambdaResult<()> {
        self.push(key, Column::Realtime, ts, value)
    }

    fn push(&self, key: &str, column: Column, ts: Timestamp, value: &str) -> LambdaResult<()> {
        self.table
            .put(Put::new(key).add_column_at(FAMILY, column.qualifier(), ts, value))?;
        Ok(())
    }

    // ==================================================================
    // Reads
    // ==================================================================

    /// Latest value of one column.
    pub fn get_item(&self, key: &str, column: Column) -> LambdaResult<String> {
        Ok(self.cell(key, column)?.value_lossy())
    }

    /// Timestamp of the latest value of one column.
    pub fn get_timestamp(&self, key: &str, column: Column) -> LambdaResult<Timestamp> {
        Ok(self.cell(key, column)?.timestamp())
    }

    fn cell(&self, key: &str, column: Column) -> LambdaResult<Cell> {
        self.table
            .get_cell(key.as_bytes(), FAMILY, column.qualifier())?
            .ok_or_else(|| LambdaError::not_found(key, column.as_str()))
    }

    /// Both columns of a row, read in one atomic get.
    pub fn row(&self, key: &str) -> LambdaResult<LambdaRow> {
        let result = self.table.get(
            Get::new(key)
                .add_column(FAMILY, BULK)
                .add_column(FAMILY, REALTIME)
                .max_versions(1),
        )?;
        Ok(LambdaRow::from_result(&result))
    }

    pub fn state(&self, key: &str) -> LambdaResult<RowState> {
        Ok(self.row(key)?.state())
    }

    /// The value readers should see for `key`.
    ///
    /// Never writes. An anomalous row fails with `InvariantViolation` and is
    /// left for `cleanup` to resolve.
    pub fn combine(&self, key: &str) -> LambdaResult<String> {
        self.metrics().increment_combine_calls();

        let combined = self.row(key).and_then(|row| {
            let combined = row.combined();
            if let Err(LambdaError::InvariantViolation {
                bulk_ts,
                realtime_ts,
                ..
            }) = &combined
            {
                self.report_anomaly(key, *bulk_ts, *realtime_ts, "combine");
            }
            combined
        });

        if combined.is_err() {
            self.metrics().increment_combine_failures();
        }
        combined
    }

    // ==================================================================
    // Reconciliation
    // ==================================================================

    /// Fold REALTIME into BULK on every row.
    ///
    /// Each row is reconciled atomically under its own lock, against the
    /// state it has at that moment. A row that fails is recorded in the
    /// report and the pass moves on; only a failure to scan aborts it.
    pub fn cleanup(&self) -> LambdaResult<CleanupReport> {
        let scope = ObservationScope::with_fields("CLEANUP", &[("table", self.table.table_name())]);
        self.metrics().increment_cleanup_runs();

        let scanner = match self.table.scan(
            Scan::new()
                .add_column(FAMILY, BULK)
                .add_column(FAMILY, REALTIME),
        ) {
            Ok(scanner) => scanner,
            Err(err) => {
                scope.fail(&err.to_string());
                return Err(err.into());
            }
        };

        let mut report = CleanupReport::default();
        for item in scanner {
            let scanned = match item {
                Ok(scanned) => scanned,
                Err(err) => {
                    scope.fail(&err.to_string());
                    return Err(err.into());
                }
            };
            report.rows_scanned += 1;

            let key = String::from_utf8_lossy(scanned.row()).into_owned();
            match self.reconcile_row(scanned.row()) {
                Ok(CleanupAction::Promote) => report.promoted += 1,
                Ok(CleanupAction::DiscardRealtime) => report.realtime_discarded += 1,
                Ok(CleanupAction::Keep) => report.unchanged += 1,
                Err(err) => {
                    log_event_with_fields(
                        Event::CleanupRowFailed,
                        &[("row", &key), ("code", err.code()), ("error", &err.to_string())],
                    );
                    report.record_failure(&key, &err);
                }
            }
        }

        scope.complete_with_fields(&[
            ("rows_scanned", &report.rows_scanned.to_string()),
            ("promoted", &report.promoted.to_string()),
            ("realtime_discarded", &report.realtime_discarded.to_string()),
            ("failures", &report.failures.len().to_string()),
        ]);
        Ok(report)
    }

    fn reconcile_row(&self, key: &[u8]) -> LambdaResult<CleanupAction> {
        let outcome = self.table.update_row(key, |snapshot| {
            let row = LambdaRow::from_result(snapshot);
            let (action, mutations) = row.cleanup_mutations();
            Ok(((action, row), mutations))
        })?;

        // the row vanished between the scan and the update
        let (action, row) = match outcome {
            Some(outcome) => outcome,
            None => return Ok(CleanupAction::Keep),
        };

        let ts = |cell: Option<&Cell>| cell.map(|c| c.timestamp().to_string()).unwrap_or_default();
        match action {
            CleanupAction::Promote => {
                self.metrics().increment_rows_promoted();
                log_event_with_fields(
                    Event::RowPromoted,
                    &[("row", row.key()), ("ts", &ts(row.realtime()))],
                );
            }
            CleanupAction::DiscardRealtime => {
                if let (Some(bulk), Some(realtime)) = (row.bulk(), row.realtime()) {
                    self.report_anomaly(row.key(), bulk.timestamp(), realtime.timestamp(), "cleanup");
                }
                self.metrics().increment_realtime_discarded();
                log_event_with_fields(
                    Event::RealtimeDiscarded,
                    &[
                        ("row", row.key()),
                        ("bulk_ts", &ts(row.bulk())),
                        ("realtime_ts", &ts(row.realtime())),
                    ],
                );
            }
            CleanupAction::Keep => {}
        }
        Ok(action)
    }

    fn report_anomaly(&self, key: &str, bulk_ts: Timestamp, realtime_ts: Timestamp, source: &str) {
        self.metrics().increment_anomalies_detected();
        log_event_with_fields(
            Event::AnomalyDetected,
            &[
                ("row", key),
                ("bulk_ts", &bulk_ts.to_string()),
                ("realtime_ts", &realtime_ts.to_string()),
                ("source", source),
            ],
        );
    }

    // ==================================================================
    // Diagnostics
    // ==================================================================

    /// Tab-separated listing of every row holding either column.
    ///
    /// Each row shows its bulk and realtime values (`None` when absent) and
    /// the combined value, or the error code when the row cannot be
    /// combined. Reading the table does not touch the combine counters.
    pub fn dump_table(&self) -> LambdaResult<String> {
        let scanner = self.table.scan(
            Scan::new()
                .add_column(FAMILY, BULK)
                .add_column(FAMILY, REALTIME)
                .max_versions(1),
        )?;

        let mut out = String::from(DUMP_HEADER);
        out.push_str(&".".repeat(DUMP_RULE_WIDTH));
        out.push('\n');

        for item in scanner {
            let row = LambdaRow::from_result(&item?);
            let value = |cell: Option<&Cell>| {
                cell.map(Cell::value_lossy)
                    .unwrap_or_else(|| "None".to_string())
            };
            let combined = row.combined().unwrap_or_else(|err| err.code().to_string());
            // writing into a String cannot fail
            let _ = writeln!(
                out,
                "{}\t{}\t{}\t\t{}",
                row.key(),
                value(row.bulk()),
                value(row.realtime()),
                combined
            );
        }
        Ok(out)
    }
}

impl Default for LambdaTable {
    fn default() -> Self {
        Self::in_memory()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ts(millis: u64) -> Timestamp {
        Timestamp::new(millis)
    }

    #[test]
    fn test_new_requires_family() {
        let table = Arc::new(Table::new("other", ["g"]));
        let err = LambdaTable::new(table).unwrap_err();
        assert_eq!(err.code(), "LS_UNKNOWN_FAMILY");

        let table = Arc::new(Table::new("lambda", ["f"]));
        assert!(LambdaTable::new(table).is_ok());
    }

    #[test]
    fn test_push_and_get_item() {
        let lambda = LambdaTable::in_memory();
        lambda.push_bulk("rowA", "bulk").unwrap();
        lambda.push_realtime("rowA", "fresh").unwrap();

        assert_eq!(lambda.get_item("rowA", Column::Bulk).unwrap(), "bulk");
        assert_eq!(lambda.get_item("rowA", Column::Realtime).unwrap(), "fresh");
        assert!(
            lambda.get_timestamp("rowA", Column::Realtime).unwrap()
                > lambda.get_timestamp("rowA", Column::Bulk).unwrap()
        );

        let err = lambda.get_item("rowZ", Column::Bulk).unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn test_push_rejects_empty_key() {
        let lambda = LambdaTable::in_memory();
        let err = lambda.push_bulk("", "v").unwrap_err();
        assert_eq!(err.code(), "LS_INVALID_ARGUMENT");
    }

    #[test]
    fn test_combine_prefers_newer_realtime() {
        let lambda = LambdaTable::in_memory();
        lambda.push_bulk_at("k", "old", ts(10)).unwrap();
        lambda.push_realtime_at("k", "new", ts(20)).unwrap();
        assert_eq!(lambda.combine("k").unwrap(), "new");
        assert_eq!(lambda.state("k").unwrap(), RowState::BothConsistent);
    }

    #[test]
    fn test_combine_anomaly_counts_failure() {
        let lambda = LambdaTable::in_memory();
        lambda.push_realtime_at("k", "rt", ts(10)).unwrap();
        lambda.push_bulk_at("k", "bulk", ts(10)).unwrap();

        let err = lambda.combine("k").unwrap_err();
        assert_eq!(err.code(), "LS_INVARIANT_VIOLATION");

        let snapshot = lambda.metrics().snapshot();
        assert_eq!(snapshot.combine_calls, 1);
        assert_eq!(snapshot.combine_failures, 1);
        assert_eq!(snapshot.anomalies_detected, 1);

        // the read did not repair anything
        assert_eq!(lambda.get_item("k", Column::Realtime).unwrap(), "rt");
    }

    #[test]
    fn test_combine_missing_key() {
        let lambda = LambdaTable::in_memory();
        assert!(lambda.combine("nope").unwrap_err().is_not_found());
    }

    #[test]
    fn test_cleanup_report() {
        let lambda = LambdaTable::in_memory();
        lambda.push_bulk_at("a", "bulk", ts(5)).unwrap();
        lambda.push_realtime_at("b", "rt", ts(5)).unwrap();
        lambda.push_bulk_at("c", "bulk", ts(9)).unwrap();
        lambda.push_realtime_at("c", "rt", ts(3)).unwrap();

        let report = lambda.cleanup().unwrap();
        assert_eq!(report.rows_scanned, 3);
        assert_eq!(report.unchanged, 1);
        assert_eq!(report.promoted, 1);
        assert_eq!(report.realtime_discarded, 1);
        assert!(report.is_clean());

        assert_eq!(lambda.get_item("b", Column::Bulk).unwrap(), "rt");
        assert_eq!(lambda.get_timestamp("b", Column::Bulk).unwrap(), ts(5));
        assert_eq!(lambda.get_item("c", Column::Bulk).unwrap(), "bulk");
        assert_eq!(lambda.state("c").unwrap(), RowState::BulkOnly);

        let snapshot = lambda.metrics().snapshot();
        assert_eq!(snapshot.cleanup_runs, 1);
        assert_eq!(snapshot.rows_promoted, 1);
        assert_eq!(snapshot.realtime_discarded, 1);
        assert_eq!(snapshot.anomalies_detected, 1);
    }

    #[test]
    fn test_dump_table_format() {
        let lambda = LambdaTable::in_memory();
        lambda.push_bulk_at("rowA", "bulk", ts(1)).unwrap();
        lambda.push_realtime_at("rowB", "rt", ts(2)).unwrap();

        let dump = lambda.dump_table().unwrap();
        let lines: Vec<&str> = dump.lines().collect();
        assert_eq!(lines[0], "key\tbulk\trealtime\tcombined");
        assert_eq!(lines[1], ".".repeat(40));
        assert_eq!(lines[2], "rowA\tbulk\tNone\t\tbulk");
        assert_eq!(lines[3], "rowB\tNone\trt\t\trt");
        assert_eq!(lines.len(), 4);
    }

    #[test]
    fn test_dump_shows_anomaly_code() {
        let lambda = LambdaTable::in_memory();
        lambda.push_bulk_at("k", "b", ts(7)).unwrap();
        lambda.push_realtime_at("k", "r", ts(7)).unwrap();

        let dump = lambda.dump_table().unwrap();
        assert!(dump.contains("k\tb\tr\t\tLS_INVARIANT_VIOLATION"));
        assert_eq!(lambda.metrics().snapshot().combine_calls, 0);
    }
}
