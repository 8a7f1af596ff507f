//! Commit clocks.

use parking_lot::Mutex;
use vcl_core::Timestamp;

/// Source of commit timestamps.
pub trait Clock: Send + Sync + std::fmt::Debug {
    /// Current time.
    fn now(&self) -> Timestamp;
}

/// Wall-clock UTC time.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Timestamp {
        Timestamp::now()
    }
}

/// A clock that only moves when told to.
#[derive(Debug)]
pub struct ManualClock {
    now: Mutex<Timestamp>,
}

impl ManualClock {
    /// Start at `start`.
    pub fn new(start: Timestamp) -> Self {
        Self {
            now: Mutex::new(start),
        }
    }

    /// Move forward by `secs` seconds and return the new time.
    pub fn advance(&self, secs: i64) -> Timestamp {
        let mut now = self.now.lock();
        *now = now.plus_secs(secs);
        *now
    }

    /// Jump to `t`.
    pub fn set(&self, t: Timestamp) {
        *self.now.lock() = t;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Timestamp {
        *self.now.lock()
    }
}
