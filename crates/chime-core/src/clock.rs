//! Wall-clock seam.
//!
//! The scheduler never reads `SystemTime` directly; it goes through the
//! [`Clock`] trait so tests can pin the current time with [`ManualClock`].

use std::sync::atomic::{AtomicI64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

use crate::error::{Error, Result};

/// Source of the current Unix epoch time in whole seconds.
pub trait Clock: Send + Sync {
    /// Current Unix epoch seconds, or an error when the wall clock is
    /// unavailable (e.g. set before the epoch).
    fn now_unix(&self) -> Result<i64>;
}

/// Production clock backed by `SystemTime`.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_unix(&self) -> Result<i64> {
        let elapsed = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_err(|e| Error::Clock(e.to_string()))?;
        Ok(elapsed.as_secs() as i64)
    }
}

/// Deterministic clock for tests: starts at a fixed instant and only moves
/// when told to.
#[derive(Debug)]
pub struct ManualClock {
    now: AtomicI64,
}

impl ManualClock {
    #[must_use]
    pub fn new(now_unix: i64) -> Self {
        Self {
            now: AtomicI64::new(now_unix),
        }
    }

    /// Set the current time to an absolute instant.
    pub fn set(&self, now_unix: i64) {
        self.now.store(now_unix, Ordering::SeqCst);
    }

    /// Advance the current time by `secs`.
    pub fn advance(&self, secs: i64) {
        self.now.fetch_add(secs, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now_unix(&self) -> Result<i64> {
        Ok(self.now.load(Ordering::SeqCst))
    }
}
