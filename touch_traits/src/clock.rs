use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Instant;

/// Millisecond time source for sampling and state timers.
///
/// - now_ms(): milliseconds since an arbitrary epoch; wraps at `u32::MAX`
/// - elapsed_ms(): wrapping difference, valid across one wrap of the counter
pub trait Clock {
    fn now_ms(&self) -> u32;

    /// Milliseconds elapsed since `since`, computed with wrapping arithmetic.
    fn elapsed_ms(&self, since: u32) -> u32 {
        self.now_ms().wrapping_sub(since)
    }
}

/// Real-time clock backed by `std::time::Instant`.
#[derive(Debug, Clone, Copy)]
pub struct MonotonicClock {
    origin: Instant,
}

impl Default for MonotonicClock {
    fn default() -> Self {
        Self::new()
    }
}

impl MonotonicClock {
    #[inline]
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Clock for MonotonicClock {
    #[inline]
    #[allow(clippy::cast_possible_truncation)]
    fn now_ms(&self) -> u32 {
        // Truncation is the wrap.
        self.origin.elapsed().as_millis() as u32
    }
}

/// Deterministic clock whose time is advanced by hand.
///
/// Clones share the same counter, so a test can keep one handle while the
/// controller owns another.
#[derive(Debug, Clone, Default)]
pub struct ManualClock {
    now: Arc<AtomicU32>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start the clock at `ms`.
    pub fn starting_at(ms: u32) -> Self {
        let clock = Self::new();
        clock.set(ms);
        clock
    }

    /// Advance the clock by `ms`, wrapping at `u32::MAX`.
    pub fn advance(&self, ms: u32) {
        let now = self.now.load(Ordering::Relaxed);
        self.now.store(now.wrapping_add(ms), Ordering::Relaxed);
    }

    pub fn set(&self, ms: u32) {
        self.now.store(ms, Ordering::Relaxed);
    }
}

impl Clock for ManualClock {
    fn now_ms(&self) -> u32 {
        self.now.load(Ordering::Relaxed)
    }
}
