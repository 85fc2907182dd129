//! Wall-clock source for cache timestamps and freshness checks.

use std::sync::atomic::{AtomicI64, Ordering};
use std::time::Duration;

use chrono::Utc;

/// Supplies the current time as milliseconds since the Unix epoch.
pub trait Clock: Send + Sync {
    fn now_epoch_ms(&self) -> i64;
}

/// The system clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_epoch_ms(&self) -> i64 {
        Utc::now().timestamp_millis()
    }
}

/// A clock that only moves when told to. Useful for exercising staleness.
#[derive(Debug, Default)]
pub struct ManualClock {
    now_ms: AtomicI64,
}

impl ManualClock {
    pub fn new(now_epoch_ms: i64) -> Self {
        Self {
            now_ms: AtomicI64::new(now_epoch_ms),
        }
    }

    pub fn set(&self, now_epoch_ms: i64) {
        self.now_ms.store(now_epoch_ms, Ordering::SeqCst);
    }

    pub fn advance(&self, by: Duration) {
        let by_ms = i64::try_from(by.as_millis()).unwrap_or(i64::MAX);
        self.now_ms.fetch_add(by_ms, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now_epoch_ms(&self) -> i64 {
        self.now_ms.load(Ordering::SeqCst)
    }
}
