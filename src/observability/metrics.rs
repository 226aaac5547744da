//! Metrics registry
//!
//! - Counters only (no gauges, no histograms)
//! - Monotonic increase
//! - One registry per table, shared with the reconciliation engine

use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

/// Operational counters of one table and its reconciliation engine
///
/// All counters use Relaxed atomics; values are exact once callers quiesce.
#[derive(Debug, Default)]
pub struct MetricsRegistry {
    /// Puts applied (one per `Put`, not per cell)
    puts: AtomicU64,
    /// Point reads served
    gets: AtomicU64,
    /// Deletes applied
    deletes: AtomicU64,
    /// Increments applied
    increments: AtomicU64,
    /// Scanners opened
    scans: AtomicU64,
    /// Writes rejected for naming an undeclared family
    unknown_family_rejections: AtomicU64,
    /// Cleanup passes started
    cleanup_runs: AtomicU64,
    /// Rows whose realtime value was promoted to bulk
    rows_promoted: AtomicU64,
    /// Realtime values discarded because bulk was newer
    realtime_discarded: AtomicU64,
    /// Rows seen with bulk timestamp >= realtime timestamp
    anomalies_detected: AtomicU64,
    /// Combine calls
    combine_calls: AtomicU64,
    /// Combine calls that returned an error
    combine_failures: AtomicU64,
}

impl MetricsRegistry {
    /// Create a new metrics registry with all counters at zero
    pub fn new() -> Self {
        Self::default()
    }

    // Store operations

    pub fn increment_puts(&self) {
        self.puts.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_gets(&self) {
        self.gets.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_deletes(&self) {
        self.deletes.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_increments(&self) {
        self.increments.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_scans(&self) {
        self.scans.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_unknown_family_rejections(&self) {
        self.unknown_family_rejections.fetch_add(1, Ordering::Relaxed);
    }

    // Reconciliation

    pub fn increment_cleanup_runs(&self) {
        self.cleanup_runs.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_rows_promoted(&self) {
        self.rows_promoted.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_realtime_discarded(&self) {
        self.realtime_discarded.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_anomalies_detected(&self) {
        self.anomalies_detected.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_combine_calls(&self) {
        self.combine_calls.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_combine_failures(&self) {
        self.combine_failures.fetch_add(1, Ordering::Relaxed);
    }

    /// Get all metrics as a snapshot
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            puts: self.puts.load(Ordering::Relaxed),
            gets: self.gets.load(Ordering::Relaxed),
            deletes: self.deletes.load(Ordering::Relaxed),
            increments: self.increments.load(Ordering::Relaxed),
            scans: self.scans.load(Ordering::Relaxed),
            unknown_family_rejections: self.unknown_family_rejections.load(Ordering::Relaxed),
            cleanup_runs: self.cleanup_runs.load(Ordering::Relaxed),
            rows_promoted: self.rows_promoted.load(Ordering::Relaxed),
            realtime_discarded: self.realtime_discarded.load(Ordering::Relaxed),
            anomalies_detected: self.anomalies_detected.load(Ordering::Relaxed),
            combine_calls: self.combine_calls.load(Ordering::Relaxed),
            combine_failures: self.combine_failures.load(Ordering::Relaxed),
        }
    }

    /// Current values as a JSON object, keys in declaration order
    pub fn to_json(&self) -> String {
        self.snapshot().to_json()
    }
}

/// A point-in-time snapshot of all metrics
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MetricsSnapshot {
    pub puts: u64,
    pub gets: u64,
    pub deletes: u64,
    pub increments: u64,
    pub scans: u64,
    pub unknown_family_rejections: u64,
    pub cleanup_runs: u64,
    pub rows_promoted: u64,
    pub realtime_discarded: u64,
    pub anomalies_detected: u64,
    pub combine_calls: u64,
    pub combine_failures: u64,
}

impl MetricsSnapshot {
    pub fn to_json(&self) -> String {
        // a struct of plain integers always serializes
        serde_json::to_string(self).unwrap_or_else(|_| String::from("{}"))
    }
}
