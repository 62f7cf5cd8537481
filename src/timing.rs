//! Monotonic time primitives for the cooperative control loop.
//!
//! Every component that "waits" does so by storing a [`Timestamp`] and
//! comparing it against the tick's `now` snapshot.  Nothing in the core
//! ever sleeps.
//!
//! Timestamps are milliseconds since boot truncated to `u32`, so they wrap
//! after ~49.7 days.  All elapsed-time math goes through
//! [`Timestamp::elapsed_since`], which uses wrapping subtraction and stays
//! correct across the wrap for any interval shorter than ~24 days.

use serde::{Deserialize, Serialize};

/// A point on the monotonic millisecond clock.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash, Serialize, Deserialize)]
pub struct Timestamp(u32);

impl Timestamp {
    /// The boot instant.
    pub const ZERO: Self = Self(0);

    pub const fn from_millis(ms: u32) -> Self {
        Self(ms)
    }

    /// Truncate a 64-bit microsecond uptime (e.g. `esp_timer_get_time`).
    pub const fn from_micros(us: u64) -> Self {
        Self((us / 1000) as u32)
    }

    pub const fn as_millis(self) -> u32 {
        self.0
    }

    /// Milliseconds elapsed from `earlier` to `self` (wrap-safe).
    pub const fn elapsed_since(self, earlier: Self) -> u32 {
        self.0.wrapping_sub(earlier.0)
    }

    /// `true` once at least `ms` milliseconds have passed since `earlier`.
    pub const fn has_elapsed(self, earlier: Self, ms: u32) -> bool {
        self.elapsed_since(earlier) >= ms
    }

    /// A timestamp `ms` later (wrapping).
    pub const fn offset(self, ms: u32) -> Self {
        Self(self.0.wrapping_add(ms))
    }
}

/// Fixed-interval gate: `poll` returns `true` at most once per interval.
///
/// Used for the periodic status heartbeat and anywhere a component needs
/// "run this no more often than every N ms" without owning a full FSM.
#[derive(Debug, Clone, Copy)]
pub struct Cadence {
    interval_ms: u32,
    last: Timestamp,
}

impl Cadence {
    /// A cadence whose first period starts at `now`.
    pub const fn new(interval_ms: u32, now: Timestamp) -> Self {
        Self {
            interval_ms,
            last: now,
        }
    }

    /// Returns `true` (and re-arms) if the interval has elapsed.
    pub fn poll(&mut self, now: Timestamp) -> bool {
        if now.has_elapsed(self.last, self.interval_ms) {
            self.last = now;
            true
        } else {
            false
        }
    }

    pub fn set_interval(&mut self, interval_ms: u32) {
        self.interval_ms = interval_ms;
    }

    pub const fn interval_ms(&self) -> u32 {
        self.interval_ms
    }
}
