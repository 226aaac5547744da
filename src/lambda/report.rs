//! Cleanup pass summary

use serde::Serialize;

use super::LambdaError;

/// A row cleanup could not reconcile
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CleanupFailure {
    pub key: String,
    pub code: &'static str,
    pub message: String,
}

/// Outcome of one `cleanup` pass.
///
/// `rows_scanned` equals `promoted + realtime_discarded + unchanged +
/// failures.len()`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CleanupReport {
    pub rows_scanned: usize,
    pub promoted: usize,
    pub realtime_discarded: usize,
    pub unchanged: usize,
    pub failures: Vec<CleanupFailure>,
}

impl CleanupReport {
    pub(crate) fn record_failure(&mut self, key: &str, err: &LambdaError) {
        self.failures.push(CleanupFailure {
            key: key.to_string(),
            code: err.code(),
            message: err.to_string(),
        });
    }

    /// Rows whose REALTIME column was removed
    #[inline]
    pub fn changed(&self) -> usize {
        self.promoted + self.realtime_discarded
    }

    /// True when every scanned row was reconciled
    #[inline]
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }

    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| "{}".to_string())
    }
}
