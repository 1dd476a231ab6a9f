//! Injectable time source
//!
//! Claim windows and key-set freshness both read "now" through a [`Clock`], so
//! tests can move time forward without sleeping.

use chrono::{DateTime, Duration as ChronoDuration, Utc};
use parking_lot::Mutex;
use std::fmt::Debug;
use std::time::Duration;

/// Source of the current time
pub trait Clock: Send + Sync + Debug {
    /// Current wall-clock time
    fn now(&self) -> DateTime<Utc>;
}

/// The system wall clock
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// A clock that only moves when told to
///
/// ```rust
/// use firebase_idtoken::clock::{Clock, ManualClock};
/// use std::time::Duration;
///
/// let clock = ManualClock::from_timestamp(1_700_000_000);
/// clock.advance(Duration::from_secs(30));
/// assert_eq!(clock.now().timestamp(), 1_700_000_030);
/// ```
#[derive(Debug)]
pub struct ManualClock {
    now: Mutex<DateTime<Utc>>,
}

impl ManualClock {
    /// Create a clock frozen at `now`
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            now: Mutex::new(now),
        }
    }

    /// Create a clock frozen at a Unix timestamp (seconds)
    ///
    /// Out-of-range timestamps fall back to the Unix epoch.
    pub fn from_timestamp(secs: i64) -> Self {
        Self::new(DateTime::from_timestamp(secs, 0).unwrap_or_default())
    }

    /// Set the current time
    pub fn set(&self, now: DateTime<Utc>) {
        *self.now.lock() = now;
    }

    /// Move the clock forward
    pub fn advance(&self, by: Duration) {
        let delta = ChronoDuration::from_std(by).unwrap_or(ChronoDuration::MAX);
        let mut now = self.now.lock();
        *now = now.checked_add_signed(delta).unwrap_or(*now);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_manual_clock_set_and_advance() {
        let clock = ManualClock::from_timestamp(100);
        assert_eq!(clock.now().timestamp(), 100);

        clock.advance(Duration::from_secs(3600));
        assert_eq!(clock.now().timestamp(), 3700);

        clock.set(DateTime::from_timestamp(5, 0).unwrap());
        assert_eq!(clock.now().timestamp(), 5);
    }

    #[test]
    fn test_system_clock_is_current() {
        let before = Utc::now();
        let now = SystemClock.now();
        assert!(now >= before);
    }
}
