//! Fixed-interval tick clock.
//!
//! Game ticks run at a fixed rate (600 ms by default) regardless of how long
//! each loop iteration takes. Elapsed wall time accumulates and every whole
//! interval in the accumulator runs one tick.

use std::time::{Duration, Instant};

use tracing::warn;

/// Most ticks run to catch up after a stall. Anything beyond is dropped.
pub const MAX_CATCH_UP_TICKS: u32 = 5;
/// Shortest interval the clock accepts.
pub const MIN_INTERVAL: Duration = Duration::from_millis(1);

/// Accumulator-driven tick clock.
pub struct TickClock {
    interval: Duration,
    previous: Instant,
    accumulator: Duration,
    tick_count: u64,
}

impl TickClock {
    /// Intervals shorter than [`MIN_INTERVAL`] are raised to it.
    pub fn new(interval: Duration) -> Self {
        Self {
            interval: interval.max(MIN_INTERVAL),
            previous: Instant::now(),
            accumulator: Duration::ZERO,
            tick_count: 0,
        }
    }

    /// Measures the wall time since the last call and runs due ticks.
    /// Returns how many ran.
    pub fn poll(&mut self, tick_fn: impl FnMut(u64)) -> u32 {
        let now = Instant::now();
        let elapsed = now.duration_since(self.previous);
        self.previous = now;
        self.advance(elapsed, tick_fn)
    }

    /// Adds `elapsed` to the accumulator and calls `tick_fn(tick_number)` once
    /// per whole interval, up to [`MAX_CATCH_UP_TICKS`].
    pub fn advance(&mut self, elapsed: Duration, mut tick_fn: impl FnMut(u64)) -> u32 {
        let cap = self.interval * MAX_CATCH_UP_TICKS;
        self.accumulator += elapsed;
        if self.accumulator > cap {
            warn!(
                behind_ms = self.accumulator.as_millis() as u64,
                "tick clock fell behind, dropping ticks"
            );
            self.accumulator = cap;
        }

        let mut ran = 0;
        while self.accumulator >= self.interval {
            tick_fn(self.tick_count);
            self.tick_count += 1;
            self.accumulator -= self.interval;
            ran += 1;
        }
        ran
    }

    /// Time left until the next tick is due.
    pub fn until_next(&self) -> Duration {
        self.interval.saturating_sub(self.accumulator)
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Total ticks run.
    pub fn tick_count(&self) -> u64 {
        self.tick_count
    }
}
