//! Time utilities for questline.
//!
//! Transaction time bounds and ledger close times are plain Unix timestamps
//! in seconds. Components that stamp time bounds never read the system clock
//! directly: they take a [`Clock`], so the sandbox ledger and tests can run on
//! virtual time that advances under program control.
//!
//! # Example
//!
//! ```rust
//! use questline_common::time::{Clock, ManualClock};
//! use std::time::Duration;
//!
//! let clock = ManualClock::new(1_700_000_000);
//! clock.advance(Duration::from_secs(300));
//! assert_eq!(clock.now_unix(), 1_700_000_300);
//! ```

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Returns the current Unix timestamp in seconds.
///
/// If the system clock is before the Unix epoch, returns 0.
pub fn current_timestamp() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or(Duration::ZERO)
        .as_secs()
}

/// Source of "now" for time bounds and predicate evaluation.
pub trait Clock: Send + Sync {
    /// Current Unix time in seconds.
    fn now_unix(&self) -> u64;
}

/// Wall-clock time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_unix(&self) -> u64 {
        current_timestamp()
    }
}

/// Virtual time that only moves when told to.
///
/// Clones share the same underlying instant, so a clock handed to a
/// transaction builder observes advances made through the sandbox ledger.
#[derive(Debug, Clone)]
pub struct ManualClock {
    now: Arc<AtomicU64>,
}

impl ManualClock {
    pub fn new(start: u64) -> Self {
        Self {
            now: Arc::new(AtomicU64::new(start)),
        }
    }

    /// Starts at the current wall-clock second.
    pub fn starting_now() -> Self {
        Self::new(current_timestamp())
    }

    pub fn advance(&self, by: Duration) {
        self.now.fetch_add(by.as_secs(), Ordering::SeqCst);
    }

    pub fn set(&self, unix: u64) {
        self.now.store(unix, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now_unix(&self) -> u64 {
        self.now.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_current_timestamp_after_2024() {
        assert!(current_timestamp() > 1_704_067_200);
    }

    #[test]
    fn test_manual_clock_clones_share_time() {
        let clock = ManualClock::new(100);
        let view = clock.clone();
        clock.advance(Duration::from_secs(5));
        assert_eq!(view.now_unix(), 105);
        view.set(42);
        assert_eq!(clock.now_unix(), 42);
    }
}
