//! # Monotonic Millisecond Clock
//!
//! A free-running 32-bit millisecond counter in the style of a microcontroller
//! tick counter. The counter wraps after ~49.7 days, so intervals must always
//! be computed with [`elapsed_ms`] rather than by comparing two timestamps.
//!
//! Built on [`tokio::time::Instant`] so tests can drive it with tokio's
//! paused clock.

use tokio::time::Instant;

/// Wrapping millisecond counter
#[derive(Debug, Clone, Copy)]
pub struct MonotonicClock {
    origin: Instant,
    offset_ms: u32,
}

impl Default for MonotonicClock {
    fn default() -> Self {
        Self::new()
    }
}

impl MonotonicClock {
    /// Create a clock reading 0 ms now
    pub fn new() -> Self {
        Self::starting_at(0)
    }

    /// Create a clock whose counter currently reads `offset_ms`
    ///
    /// Useful for exercising counter wraparound without waiting 49 days.
    pub fn starting_at(offset_ms: u32) -> Self {
        Self {
            origin: Instant::now(),
            offset_ms,
        }
    }

    /// Current counter value in milliseconds
    pub fn now_ms(&self) -> u32 {
        // Truncating the u128 keeps the low 32 bits, i.e. wraps like a tick counter
        let elapsed = self.origin.elapsed().as_millis() as u32;
        self.offset_ms.wrapping_add(elapsed)
    }
}

/// Milliseconds from `since` to `now`, correct across counter wraparound
#[inline]
pub fn elapsed_ms(now: u32, since: u32) -> u32 {
    now.wrapping_sub(since)
}
