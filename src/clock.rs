//! # Time Sources
//!
//! Two notions of time are used by the node:
//! - a monotonic millisecond [`Clock`] for rate limiting (reconnect attempts)
//! - a wall-clock [`TimeSource`] that stamps readings with ISO-8601 strings
//!
//! Wall-clock acquisition may fail (clock not yet synchronized). Callers then
//! fall back to [`TIMESTAMP_SENTINEL`] instead of blocking.

use chrono::{DateTime, Datelike, Local, TimeZone};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;
use tracing::warn;

/// Placeholder timestamp used when the wall clock is unavailable
pub const TIMESTAMP_SENTINEL: &str = "0000-00-00T00:00:00Z";

/// Years before this are treated as "clock never synchronized"
const MIN_SYNCED_YEAR: i32 = 2020;

/// Monotonic millisecond clock
pub trait Clock: Send {
    /// Milliseconds since an arbitrary fixed origin
    fn now_ms(&self) -> u64;
}

/// Clock backed by `std::time::Instant`
#[derive(Debug, Clone)]
pub struct SystemClock {
    origin: Instant,
}

impl SystemClock {
    pub fn new() -> Self {
        Self { origin: Instant::now() }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SystemClock {
    fn now_ms(&self) -> u64 {
        self.origin.elapsed().as_millis() as u64
    }
}

/// Manually advanced clock for tests and replay
///
/// # Examples
///
/// ```
/// use watt_node::clock::{Clock, ManualClock};
///
/// let clock = ManualClock::new(0);
/// clock.advance(1500);
/// assert_eq!(clock.now_ms(), 1500);
/// ```
#[derive(Debug, Default)]
pub struct ManualClock {
    now: AtomicU64,
}

impl ManualClock {
    pub fn new(start_ms: u64) -> Self {
        Self { now: AtomicU64::new(start_ms) }
    }

    pub fn advance(&self, ms: u64) {
        self.now.fetch_add(ms, Ordering::Relaxed);
    }

    pub fn set(&self, ms: u64) {
        self.now.store(ms, Ordering::Relaxed);
    }
}

impl Clock for ManualClock {
    fn now_ms(&self) -> u64 {
        self.now.load(Ordering::Relaxed)
    }
}

impl<C: Clock + Sync> Clock for std::sync::Arc<C> {
    fn now_ms(&self) -> u64 {
        (**self).now_ms()
    }
}

/// Wall-clock timestamp source
pub trait TimeSource: Send {
    /// Current time as an ISO-8601 string, or `None` if unavailable
    fn timestamp(&self) -> Option<String>;

    /// Current time, or [`TIMESTAMP_SENTINEL`] if unavailable
    fn timestamp_or_sentinel(&self) -> String {
        self.timestamp().unwrap_or_else(|| {
            warn!("Failed to obtain time, using placeholder timestamp");
            TIMESTAMP_SENTINEL.to_string()
        })
    }
}

/// Formats a local date-time as ISO-8601 with a `+HH:MM` offset.
///
/// Returns `None` if the clock has evidently never been synchronized.
pub fn format_iso8601<Tz: TimeZone>(time: &DateTime<Tz>) -> Option<String>
where
    Tz::Offset: std::fmt::Display,
{
    if time.year() < MIN_SYNCED_YEAR {
        return None;
    }
    Some(time.format("%Y-%m-%dT%H:%M:%S%:z").to_string())
}

/// Time source reading the host's local clock
#[derive(Debug, Clone, Default)]
pub struct LocalTimeSource;

impl TimeSource for LocalTimeSource {
    fn timestamp(&self) -> Option<String> {
        format_iso8601(&Local::now())
    }
}

/// Time source returning a fixed value (or nothing), for tests
#[derive(Debug, Clone)]
pub struct FixedTimeSource(pub Option<String>);

impl TimeSource for FixedTimeSource {
    fn timestamp(&self) -> Option<String> {
        self.0.clone()
    }
}
