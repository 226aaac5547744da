//! Simulated per-call latency

use std::thread;
use std::time::Duration;

use rand::Rng;

/// Fixed delay plus uniform random jitter, applied at the start of every
/// table call. Zero by default.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Latency {
    base: Duration,
    jitter_ms: u64,
}

impl Latency {
    pub fn new(base: Duration, jitter: Duration) -> Self {
        Self {
            base,
            jitter_ms: u64::try_from(jitter.as_millis()).unwrap_or(u64::MAX),
        }
    }

    pub fn none() -> Self {
        Self::default()
    }

    #[inline]
    pub fn is_zero(&self) -> bool {
        self.base.is_zero() && self.jitter_ms == 0
    }

    /// Delay drawn for one call.
    pub fn sample(&self) -> Duration {
        if self.jitter_ms == 0 {
            return self.base;
        }
        let extra = rand::thread_rng().gen_range(0..=self.jitter_ms);
        self.base + Duration::from_millis(extra)
    }

    /// Sleep for one sampled delay.
    pub fn pause(&self) {
        if !self.is_zero() {
            thread::sleep(self.sample());
        }
    }
}
