//! Wall-clock source for budget checks and trigger due times.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

pub trait Clock: Send + Sync {
    /// Milliseconds since the Unix epoch
    fn now_millis(&self) -> u64;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_millis(&self) -> u64 {
        now_millis()
    }
}

pub fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

/// Deterministic clock that advances by a fixed step on every read.
///
/// Lets hosts and tests cut runs after a predictable number of budget checks.
#[derive(Debug)]
pub struct SteppingClock {
    now: AtomicU64,
    step_ms: u64,
}

impl SteppingClock {
    pub fn new(start_ms: u64, step_ms: u64) -> Self {
        Self {
            now: AtomicU64::new(start_ms),
            step_ms,
        }
    }

    /// Jump forward without counting as a read
    pub fn advance(&self, ms: u64) {
        self.now.fetch_add(ms, Ordering::SeqCst);
    }
}

impl Clock for SteppingClock {
    fn now_millis(&self) -> u64 {
        self.now.fetch_add(self.step_ms, Ordering::SeqCst)
    }
}
