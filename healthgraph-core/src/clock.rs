//! Time Source
//!
//! Health decay compares timestamps, so the graph reads time through the
//! [`Clock`] trait instead of calling the system clock directly. Production
//! code uses [`SystemClock`]; tests drive decay deterministically with
//! [`ManualClock`].

use std::sync::atomic::{AtomicI64, Ordering};
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

/// A source of nanosecond timestamps.
pub trait Clock: Send + Sync {
    /// Current time in nanoseconds.
    fn now(&self) -> i64;
}

/// Monotonic clock anchored to the Unix epoch.
///
/// The epoch offset is sampled once at construction; after that only the
/// monotonic `Instant` advances, so wall-clock jumps never move time backwards.
#[derive(Debug, Clone)]
pub struct SystemClock {
    anchor: Instant,
    epoch_nanos: i64,
}

impl SystemClock {
    pub fn new() -> Self {
        let epoch_nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(duration_nanos)
            .unwrap_or(0);
        Self {
            anchor: Instant::now(),
            epoch_nanos,
        }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SystemClock {
    fn now(&self) -> i64 {
        self.epoch_nanos
            .saturating_add(duration_nanos(self.anchor.elapsed()))
    }
}

/// Hand-driven clock for tests and simulations.
#[derive(Debug, Default)]
pub struct ManualClock {
    nanos: AtomicI64,
}

impl ManualClock {
    /// Create a clock reading `start` nanoseconds.
    pub fn new(start: i64) -> Self {
        Self {
            nanos: AtomicI64::new(start),
        }
    }

    /// Jump to an absolute time.
    pub fn set(&self, nanos: i64) {
        self.nanos.store(nanos, Ordering::SeqCst);
    }

    /// Move the clock forward.
    pub fn advance(&self, by: Duration) {
        self.nanos.fetch_add(duration_nanos(by), Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> i64 {
        self.nanos.load(Ordering::SeqCst)
    }
}

/// Saturating conversion; durations past ~292 years clamp to `i64::MAX`.
pub(crate) fn duration_nanos(d: Duration) -> i64 {
    i64::try_from(d.as_nanos()).unwrap_or(i64::MAX)
}
