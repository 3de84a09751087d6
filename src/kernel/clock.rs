// Monotonic time for the event loop
//
// Instant counts microseconds since the clock's epoch (boot on real
// hardware). u64 micros covers ~584k years, so arithmetic saturates
// rather than wraps. Intervals are plain core::time::Duration.

use core::fmt;
use core::ops::{Add, Sub};
use core::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Instant(u64);

impl Instant {
    pub const ZERO: Instant = Instant(0);

    pub const fn from_micros(us: u64) -> Self {
        Instant(us)
    }

    pub const fn from_millis(ms: u64) -> Self {
        Instant(ms.saturating_mul(1_000))
    }

    pub const fn from_secs(s: u64) -> Self {
        Instant(s.saturating_mul(1_000_000))
    }

    pub const fn as_micros(self) -> u64 {
        self.0
    }

    pub const fn as_millis(self) -> u64 {
        self.0 / 1_000
    }

    /// Time elapsed from `earlier` to `self`, zero if `earlier` is later.
    pub fn saturating_duration_since(self, earlier: Instant) -> Duration {
        Duration::from_micros(self.0.saturating_sub(earlier.0))
    }
}

// rounded up: a deadline may land late, never early
fn duration_micros(d: Duration) -> u64 {
    let us = u64::try_from(d.as_micros()).unwrap_or(u64::MAX);
    if d.subsec_nanos() % 1_000 == 0 {
        us
    } else {
        us.saturating_add(1)
    }
}

impl Add<Duration> for Instant {
    type Output = Instant;

    fn add(self, rhs: Duration) -> Instant {
        Instant(self.0.saturating_add(duration_micros(rhs)))
    }
}

impl Sub for Instant {
    type Output = Duration;

    fn sub(self, rhs: Instant) -> Duration {
        self.saturating_duration_since(rhs)
    }
}

impl fmt::Display for Instant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{:06}s", self.0 / 1_000_000, self.0 % 1_000_000)
    }
}

/// Time source the loop runs against.
///
/// `now` must never go backwards. `sleep` is best effort: it may return
/// early (an interrupt woke the core) or late (a slow tick), and the
/// loop always re-reads `now` afterwards instead of trusting it.
pub trait Clock {
    fn now(&mut self) -> Instant;

    fn sleep(&mut self, duration: Duration);
}
