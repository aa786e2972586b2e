//! # Temporal Types
//!
//! Millisecond-precision UTC timestamps and the [`Clock`] abstraction used by
//! every freshness and eviction rule.
//!
//! Persisted records store timestamps as plain integers (milliseconds since
//! the Unix epoch) so that they round-trip losslessly through JSON.

use std::sync::atomic::{AtomicI64, Ordering};
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// How long a probe result, preferred-gateway pointer, or status entry is
/// considered fresh.
pub const FRESHNESS_WINDOW: Duration = Duration::from_secs(60 * 60);

/// Milliseconds since the Unix epoch, UTC.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Timestamp(i64);

impl Timestamp {
    /// Create a timestamp from raw epoch milliseconds.
    pub const fn from_millis(millis: i64) -> Self {
        Self(millis)
    }

    /// Return the raw epoch milliseconds.
    pub const fn as_millis(&self) -> i64 {
        self.0
    }

    /// Current wall-clock time.
    pub fn now() -> Self {
        Self(Utc::now().timestamp_millis())
    }

    /// Elapsed time from `self` until `now`, saturating at zero when `self`
    /// lies in the future (clock skew).
    pub fn elapsed_until(&self, now: Timestamp) -> Duration {
        let delta = now.0.saturating_sub(self.0);
        Duration::from_millis(delta.max(0) as u64)
    }

    /// Whether `self` is strictly less than `window` old at `now`.
    pub fn is_fresh(&self, now: Timestamp, window: Duration) -> bool {
        self.elapsed_until(now) < window
    }

    /// Convert to a `chrono` datetime for display.
    pub fn to_datetime(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp_millis(self.0)
    }
}

impl std::fmt::Display for Timestamp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.to_datetime() {
            Some(dt) => write!(f, "{}", dt.format("%Y-%m-%dT%H:%M:%S%.3fZ")),
            None => write!(f, "{}ms", self.0),
        }
    }
}

impl From<DateTime<Utc>> for Timestamp {
    fn from(dt: DateTime<Utc>) -> Self {
        Self(dt.timestamp_millis())
    }
}

/// Source of the current time.
///
/// Implementations must be `Send + Sync` so they can be shared behind an
/// `Arc` by the cache store, resolver, and status checker.
pub trait Clock: Send + Sync + std::fmt::Debug {
    /// Return the current time.
    fn now(&self) -> Timestamp;
}

/// Wall-clock time via `chrono::Utc::now()`.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Timestamp {
        Timestamp::now()
    }
}

/// A clock that only moves when told to.
#[derive(Debug, Default)]
pub struct ManualClock {
    millis: AtomicI64,
}

impl ManualClock {
    /// Create a clock frozen at `start`.
    pub fn new(start: Timestamp) -> Self {
        Self {
            millis: AtomicI64::new(start.as_millis()),
        }
    }

    /// Set the current time.
    pub fn set(&self, to: Timestamp) {
        self.millis.store(to.as_millis(), Ordering::SeqCst);
    }

    /// Move the clock forward by `by`.
    pub fn advance(&self, by: Duration) {
        let ms = i64::try_from(by.as_millis()).unwrap_or(i64::MAX);
        self.millis.fetch_add(ms, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Timestamp {
        Timestamp(self.millis.load(Ordering::SeqCst))
    }
}
