//! Injected wall clock
//!
//! Every time-dependent rule (accrual, upkeep gating, price freshness) reads
//! the time through [`Clock`], so tests drive it with a [`ManualClock`].

use crate::types::Timestamp;
use parking_lot::Mutex;

/// Source of unix time in seconds
pub trait Clock: Send + Sync {
    fn now(&self) -> Timestamp;
}

/// Wall clock backed by the system time
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Timestamp {
        chrono::Utc::now().timestamp()
    }
}

/// Clock that only moves when told to
#[derive(Debug)]
pub struct ManualClock {
    now: Mutex<Timestamp>,
}

impl ManualClock {
    pub fn new(start: Timestamp) -> Self {
        Self {
            now: Mutex::new(start),
        }
    }

    /// Move forward by `secs` and return the new time
    pub fn advance(&self, secs: u64) -> Timestamp {
        let mut now = self.now.lock();
        *now += secs as Timestamp;
        *now
    }

    /// Jump to an absolute time; never moves backwards
    pub fn set(&self, timestamp: Timestamp) {
        let mut now = self.now.lock();
        *now = (*now).max(timestamp);
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new(0)
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Timestamp {
        *self.now.lock()
    }
}
