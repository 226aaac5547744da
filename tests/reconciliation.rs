//! Reconciliation Tests
//!
//! Test Categories:
//! 1. Combine by row state
//! 2. Cleanup postconditions
//! 3. Idempotence and read-only combine
//! 4. The walkthrough scenario end to end

use std::sync::Arc;

use lambdastore::lambda::{Column, LambdaTable, RowState, BULK, FAMILY, REALTIME};
use lambdastore::table::{Get, Put, Scan, Table, Timestamp};

fn ts(millis: u64) -> Timestamp {
    Timestamp::new(millis)
}

/// Builds a table with one row per state, at fixed timestamps.
fn seeded() -> LambdaTable {
    let lambda = LambdaTable::in_memory();
    // BULK_ONLY
    lambda.push_bulk_at("bulkOnly", "b1", ts(100)).unwrap();
    // REALTIME_ONLY
    lambda.push_realtime_at("rtOnly", "r1", ts(200)).unwrap();
    // BOTH_CONSISTENT
    lambda.push_bulk_at("consistent", "b2", ts(100)).unwrap();
    lambda.push_realtime_at("consistent", "r2", ts(300)).unwrap();
    // BOTH_ANOMALOUS
    lambda.push_realtime_at("anomalous", "r3", ts(100)).unwrap();
    lambda.push_bulk_at("anomalous", "b3", ts(400)).unwrap();
    lambda
}

// =============================================================================
// COMBINE BY STATE
// =============================================================================

/// Test: combine resolves every non-anomalous state and fails the others.
#[test]
fn test_combine_by_state() {
    let lambda = seeded();

    assert_eq!(lambda.combine("bulkOnly").unwrap(), "b1");
    assert_eq!(lambda.combine("rtOnly").unwrap(), "r1");
    assert_eq!(lambda.combine("consistent").unwrap(), "r2");

    let err = lambda.combine("anomalous").unwrap_err();
    assert_eq!(err.code(), "LS_INVARIANT_VIOLATION");

    let err = lambda.combine("neverWritten").unwrap_err();
    assert!(err.is_not_found());
}

/// Test: state classification matches what was written.
#[test]
fn test_states_of_seeded_rows() {
    let lambda = seeded();
    assert_eq!(lambda.state("bulkOnly").unwrap(), RowState::BulkOnly);
    assert_eq!(lambda.state("rtOnly").unwrap(), RowState::RealtimeOnly);
    assert_eq!(lambda.state("consistent").unwrap(), RowState::BothConsistent);
    assert_eq!(lambda.state("anomalous").unwrap(), RowState::BothAnomalous);
    assert_eq!(lambda.state("neverWritten").unwrap(), RowState::Empty);
}

/// Test: equal timestamps on both columns are anomalous, not consistent.
#[test]
fn test_equal_timestamps_are_anomalous() {
    let lambda = LambdaTable::in_memory();
    lambda.push_bulk_at("k", "b", ts(50)).unwrap();
    lambda.push_realtime_at("k", "r", ts(50)).unwrap();

    assert_eq!(lambda.state("k").unwrap(), RowState::BothAnomalous);
    assert!(lambda.combine("k").is_err());
}

/// Test: only the latest version of each column decides the state.
#[test]
fn test_older_versions_do_not_affect_combine() {
    let table = Arc::new(Table::new("lambda", ["f"]).with_max_versions(3));
    let lambda = LambdaTable::new(Arc::clone(&table)).unwrap();

    lambda.push_bulk_at("k", "b-old", ts(10)).unwrap();
    lambda.push_realtime_at("k", "r-old", ts(5)).unwrap();
    lambda.push_realtime_at("k", "r-new", ts(20)).unwrap();

    assert_eq!(lambda.combine("k").unwrap(), "r-new");
}

// =============================================================================
// CLEANUP POSTCONDITIONS
// =============================================================================

/// Test: after cleanup no row holds a REALTIME value.
#[test]
fn test_cleanup_removes_every_realtime_value() {
    let lambda = seeded();
    let report = lambda.cleanup().unwrap();

    assert_eq!(report.rows_scanned, 4);
    assert_eq!(report.promoted, 2);
    assert_eq!(report.realtime_discarded, 1);
    assert_eq!(report.unchanged, 1);
    assert!(report.is_clean());

    let remaining: Vec<_> = lambda
        .table()
        .scan(Scan::new().add_column(FAMILY, REALTIME))
        .unwrap()
        .collect::<Result<_, _>>()
        .unwrap();
    assert!(remaining.is_empty());
}

/// Test: cleanup turns every row into BULK_ONLY with the right value.
#[test]
fn test_cleanup_results() {
    let lambda = seeded();
    lambda.cleanup().unwrap();

    for key in ["bulkOnly", "rtOnly", "consistent", "anomalous"] {
        assert_eq!(lambda.state(key).unwrap(), RowState::BulkOnly, "row {}", key);
    }
    assert_eq!(lambda.combine("bulkOnly").unwrap(), "b1");
    assert_eq!(lambda.combine("rtOnly").unwrap(), "r1");
    assert_eq!(lambda.combine("consistent").unwrap(), "r2");
    // anomalous rows keep their bulk value
    assert_eq!(lambda.combine("anomalous").unwrap(), "b3");
}

/// Test: a promoted value keeps the realtime timestamp.
#[test]
fn test_promotion_keeps_realtime_timestamp() {
    let lambda = seeded();
    lambda.cleanup().unwrap();

    assert_eq!(lambda.get_timestamp("consistent", Column::Bulk).unwrap(), ts(300));
    assert_eq!(lambda.get_timestamp("rtOnly", Column::Bulk).unwrap(), ts(200));
    assert_eq!(lambda.get_timestamp("anomalous", Column::Bulk).unwrap(), ts(400));
}

/// Test: the superseded bulk version is retained as history.
#[test]
fn test_promotion_keeps_bulk_history() {
    let table = Arc::new(Table::new("lambda", ["f"]));
    let lambda = LambdaTable::new(Arc::clone(&table)).unwrap();
    lambda.push_bulk_at("k", "old", ts(10)).unwrap();
    lambda.push_realtime_at("k", "new", ts(20)).unwrap();
    lambda.cleanup().unwrap();

    let history = table
        .get(Get::new("k").add_column(FAMILY, BULK).max_versions(10))
        .unwrap();
    let values: Vec<_> = history.cells().iter().map(|c| c.value_lossy()).collect();
    assert_eq!(values, vec!["new", "old"]);
}

/// Test: cleanup leaves rows in other families untouched.
#[test]
fn test_cleanup_ignores_unrelated_rows() {
    let table = Arc::new(Table::new("lambda", ["f", "meta"]));
    let lambda = LambdaTable::new(Arc::clone(&table)).unwrap();
    table.put_cell("other", "meta", "owner", "ops").unwrap();
    lambda.push_realtime_at("k", "v", ts(1)).unwrap();

    let report = lambda.cleanup().unwrap();
    assert_eq!(report.rows_scanned, 1);
    assert_eq!(
        table.get_cell(b"other", b"meta", b"owner").unwrap().unwrap().value(),
        b"ops"
    );
}

/// Test: rows with non-UTF-8 keys are promoted under their own key.
#[test]
fn test_cleanup_promotes_binary_row_key() {
    let table = Arc::new(Table::new("lambda", ["f"]));
    let lambda = LambdaTable::new(Arc::clone(&table)).unwrap();
    let key = vec![0xff, 0xfe, b'k'];
    table
        .put(Put::new(key.clone()).add_column_at(FAMILY, REALTIME, ts(10), "rt"))
        .unwrap();

    let report = lambda.cleanup().unwrap();
    assert_eq!(report.promoted, 1);
    assert!(report.is_clean());

    let bulk = table.get_cell(&key, FAMILY, BULK).unwrap().unwrap();
    assert_eq!(bulk.value(), b"rt");
    assert_eq!(bulk.timestamp(), ts(10));
    assert!(table.get_cell(&key, FAMILY, REALTIME).unwrap().is_none());
}

// =============================================================================
// IDEMPOTENCE AND READ-ONLY COMBINE
// =============================================================================

/// Test: a second cleanup changes nothing.
#[test]
fn test_cleanup_is_idempotent() {
    let lambda = seeded();
    lambda.cleanup().unwrap();
    let before = lambda.dump_table().unwrap();

    let report = lambda.cleanup().unwrap();
    assert_eq!(report.changed(), 0);
    assert_eq!(report.unchanged, 4);
    assert_eq!(lambda.dump_table().unwrap(), before);
}

/// Test: combine never modifies the table, even on anomalous rows.
#[test]
fn test_combine_does_not_write() {
    let lambda = seeded();
    let before = lambda.dump_table().unwrap();
    let puts_before = lambda.metrics().snapshot().puts;

    for key in ["bulkOnly", "rtOnly", "consistent", "anomalous", "missing"] {
        let _ = lambda.combine(key);
    }

    assert_eq!(lambda.dump_table().unwrap(), before);
    assert_eq!(lambda.metrics().snapshot().puts, puts_before);
    assert_eq!(lambda.get_item("anomalous", Column::Realtime).unwrap(), "r3");
}

/// Test: cleanup on an empty table is a no-op.
#[test]
fn test_cleanup_empty_table() {
    let lambda = LambdaTable::in_memory();
    let report = lambda.cleanup().unwrap();
    assert_eq!(report.rows_scanned, 0);
    assert!(report.is_clean());
}

/// Test: stamped-now pushes order realtime after an earlier bulk push.
#[test]
fn test_clock_orders_pushes() {
    let lambda = LambdaTable::in_memory();
    lambda.push_bulk("k", "bulk").unwrap();
    lambda.push_realtime("k", "rt").unwrap();
    assert_eq!(lambda.state("k").unwrap(), RowState::BothConsistent);

    lambda.push_bulk("k", "newer bulk").unwrap();
    assert_eq!(lambda.state("k").unwrap(), RowState::BothAnomalous);
}

// =============================================================================
// WALKTHROUGH SCENARIO
// =============================================================================

/// Test: the six-step walkthrough ends with the expected table.
#[test]
fn test_walkthrough_scenario() {
    let lambda = LambdaTable::in_memory();

    for key in ["rowA", "rowB", "rowC"] {
        lambda.push_bulk(key, "bulk").unwrap();
    }
    lambda.cleanup().unwrap();

    lambda.push_realtime("rowA", "rtOvrd").unwrap();
    lambda.push_realtime("rowB", "rtOvrd").unwrap();
    assert_eq!(lambda.combine("rowA").unwrap(), "rtOvrd");
    assert_eq!(lambda.combine("rowC").unwrap(), "bulk");

    lambda.cleanup().unwrap();
    assert_eq!(lambda.get_item("rowB", Column::Bulk).unwrap(), "rtOvrd");

    lambda.push_realtime("rowB", "rtOvrd2").unwrap();
    lambda.push_realtime("rowC", "rtOvrd2").unwrap();

    lambda.push_bulk("rowA", "bulkOvr").unwrap();
    lambda.push_bulk("rowB", "bulkOvr").unwrap();
    assert_eq!(lambda.state("rowB").unwrap(), RowState::BothAnomalous);

    let report = lambda.cleanup().unwrap();
    assert_eq!(report.promoted, 1);
    assert_eq!(report.realtime_discarded, 1);

    let expected = "key\tbulk\trealtime\tcombined\n\
                    ........................................\n\
                    rowA\tbulkOvr\tNone\t\tbulkOvr\n\
                    rowB\tbulkOvr\tNone\t\tbulkOvr\n\
                    rowC\trtOvrd2\tNone\t\trtOvrd2\n";
    assert_eq!(lambda.dump_table().unwrap(), expected);
}
