//! Cell timestamps and the per-table write clock

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::Utc;
use serde::{Deserialize, Serialize};

/// Version timestamp in milliseconds since the Unix epoch.
///
/// Totally ordered. The greatest timestamp of a column is its latest version.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Timestamp(u64);

impl Timestamp {
    /// Smallest representable timestamp.
    pub const MIN: Timestamp = Timestamp(0);

    /// Largest timestamp a stored version can carry.
    pub const MAX: Timestamp = Timestamp(u64::MAX - 1);

    /// Placeholder meaning "assign at write time".
    ///
    /// Puts carrying this value get a fresh timestamp from the table clock.
    /// It is never stored.
    pub const LATEST: Timestamp = Timestamp(u64::MAX);

    #[inline]
    pub const fn new(millis: u64) -> Self {
        Self(millis)
    }

    #[inline]
    pub fn as_u64(&self) -> u64 {
        self.0
    }

    /// Current wall-clock time, clamped to zero before the epoch.
    pub fn wall_clock() -> Self {
        Self(Utc::now().timestamp_millis().max(0) as u64)
    }

    #[inline]
    pub fn is_latest(&self) -> bool {
        *self == Self::LATEST
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for Timestamp {
    fn from(millis: u64) -> Self {
        Self(millis)
    }
}

/// Write clock handing out strictly increasing timestamps.
///
/// Follows the wall clock, but never repeats or goes backwards: two writes
/// landing in the same millisecond get consecutive values.
#[derive(Debug, Default)]
pub struct Clock {
    last: AtomicU64,
}

impl Clock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the next timestamp.
    pub fn next(&self) -> Timestamp {
        let now = Timestamp::wall_clock().as_u64();
        let mut current = self.last.load(Ordering::Acquire);
        loop {
            // LATEST is reserved
            let candidate = now.max(current + 1).min(u64::MAX - 1);
            match self.last.compare_exchange_weak(
                current,
                candidate,
                Ordering::AcqRel,
                Ordering::Acquire,
            ) {
                Ok(_) => return Timestamp(candidate),
                Err(observed) => current = observed,
            }
        }
    }

    /// Last timestamp handed out, or `Timestamp::MIN` if none yet.
    pub fn last(&self) -> Timestamp {
        Timestamp(self.last.load(Ordering::Acquire))
    }
}
