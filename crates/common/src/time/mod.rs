//! Time abstraction for testability
//!
//! Token freshness is decided on wall-clock Unix seconds, so every component
//! that compares against `expires_at` asks a [`Clock`] instead of reading
//! `SystemTime` directly. Tests swap in [`MockClock`] and move time by hand.
//!
//! # Examples
//!
//! ```
//! use std::time::Duration;
//!
//! use crmchat_common::time::{Clock, MockClock};
//!
//! let clock = MockClock::at_unix_seconds(1_700_000_000);
//! clock.advance(Duration::from_secs(60));
//! assert_eq!(clock.unix_seconds(), 1_700_000_060);
//! ```

use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

/// Trait for time operations to enable testing
pub trait Clock: Send + Sync {
    /// Get current instant (monotonic time)
    fn now(&self) -> Instant;

    /// Get current system time (wall clock)
    fn system_time(&self) -> SystemTime;

    /// Whole seconds since the UNIX epoch
    ///
    /// This is the unit used for `expires_at`, refresh delays and
    /// `lastRefreshTime`. Times before the epoch read as `0`.
    fn unix_seconds(&self) -> i64 {
        let secs = self.system_time().duration_since(UNIX_EPOCH).unwrap_or_default().as_secs();
        i64::try_from(secs).unwrap_or(i64::MAX)
    }

    /// Get milliseconds since UNIX epoch
    fn millis_since_epoch(&self) -> u64 {
        let millis = self.system_time().duration_since(UNIX_EPOCH).unwrap_or_default().as_millis();
        u64::try_from(millis).unwrap_or(u64::MAX)
    }
}

/// Real system clock implementation
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }

    fn system_time(&self) -> SystemTime {
        SystemTime::now()
    }
}

/// Mock clock for deterministic testing
///
/// Clones share the same underlying time, so a clock handed to a store can
/// still be advanced from the test body.
///
/// ```
/// use std::time::Duration;
///
/// use crmchat_common::time::{Clock, MockClock};
///
/// let clock = MockClock::new();
/// let start = clock.now();
/// clock.advance(Duration::from_secs(5));
/// assert_eq!(clock.now().duration_since(start), Duration::from_secs(5));
/// ```
#[derive(Debug, Clone)]
pub struct MockClock {
    start: Instant,
    elapsed: Arc<Mutex<Duration>>,
    base_system_time: Arc<Mutex<SystemTime>>,
}

impl MockClock {
    /// Create a new mock clock starting at the current real time
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
            elapsed: Arc::new(Mutex::new(Duration::ZERO)),
            base_system_time: Arc::new(Mutex::new(SystemTime::now())),
        }
    }

    /// Create a mock clock whose wall clock reads `secs` since the epoch
    pub fn at_unix_seconds(secs: i64) -> Self {
        let clock = Self::new();
        clock.set_unix_seconds(secs);
        clock
    }

    /// Advance the mock clock by a duration
    ///
    /// Both the monotonic and the wall-clock readings move forward.
    pub fn advance(&self, duration: Duration) {
        let mut elapsed = self.elapsed.lock().unwrap_or_else(PoisonError::into_inner);
        *elapsed += duration;
    }

    /// Set the mock clock to a specific elapsed time
    pub fn set_elapsed(&self, duration: Duration) {
        let mut elapsed = self.elapsed.lock().unwrap_or_else(PoisonError::into_inner);
        *elapsed = duration;
    }

    /// Pin the wall clock to `secs` since the epoch
    ///
    /// The elapsed offset is kept, so `unix_seconds()` reads exactly `secs`
    /// right after the call and keeps moving with `advance`.
    pub fn set_unix_seconds(&self, secs: i64) {
        let elapsed = self.elapsed();
        let target = UNIX_EPOCH + Duration::from_secs(u64::try_from(secs).unwrap_or(0));
        let base = target.checked_sub(elapsed).unwrap_or(UNIX_EPOCH);
        *self.base_system_time.lock().unwrap_or_else(PoisonError::into_inner) = base;
    }

    /// Get the total elapsed time since clock creation
    pub fn elapsed(&self) -> Duration {
        *self.elapsed.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for MockClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for MockClock {
    fn now(&self) -> Instant {
        self.start + self.elapsed()
    }

    fn system_time(&self) -> SystemTime {
        *self.base_system_time.lock().unwrap_or_else(PoisonError::into_inner) + self.elapsed()
    }
}
