//! A single fixed counting window.

use std::time::Duration;
use tokio::time::Instant;

/// One capacity/interval rule enforced by a [`RateLimiter`](super::RateLimiter).
///
/// A window grants at most `capacity` permits per `interval`. Its interval
/// restarts lazily: nothing happens in the background, the window notices an
/// elapsed interval the next time the limiter touches it.
#[derive(Debug, Clone)]
pub struct Window {
    /// Length of one interval
    interval: Duration,
    /// Maximum permits per interval
    capacity: u32,
    /// Permits consumed since `window_start`
    count: u32,
    /// When the current interval started
    window_start: Instant,
    /// Distance between two evenly paced permits
    even_spacing: Duration,
}

impl Window {
    /// Create a window granting `capacity` permits every `interval`.
    ///
    /// # Panics
    ///
    /// Panics if `capacity` is zero.
    pub fn new(interval: Duration, capacity: u32) -> Self {
        assert!(capacity > 0, "window capacity must be greater than zero");

        Self {
            interval,
            capacity,
            count: 0,
            window_start: Instant::now(),
            even_spacing: interval / capacity,
        }
    }

    /// Window of `capacity` permits per second.
    pub fn per_second(capacity: u32) -> Self {
        Self::new(Duration::from_secs(1), capacity)
    }

    /// Window of `capacity` permits per minute.
    pub fn per_minute(capacity: u32) -> Self {
        Self::new(Duration::from_secs(60), capacity)
    }

    /// Window of `capacity` permits per hour.
    pub fn per_hour(capacity: u32) -> Self {
        Self::new(Duration::from_secs(3600), capacity)
    }

    /// Length of one interval.
    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Maximum permits per interval.
    pub fn capacity(&self) -> u32 {
        self.capacity
    }

    /// Spacing between permits when pacing evenly.
    pub fn even_spacing(&self) -> Duration {
        self.even_spacing
    }

    #[cfg(test)]
    fn count(&self) -> u32 {
        self.count
    }

    fn elapsed(&self, now: Instant) -> Duration {
        now.saturating_duration_since(self.window_start)
    }

    fn is_due(&self, now: Instant) -> bool {
        self.elapsed(now) >= self.interval
    }

    /// Start a new interval at `now` if the current one has run out.
    pub(crate) fn reset_if_due(&mut self, now: Instant) -> bool {
        if self.is_due(now) {
            self.count = 0;
            self.window_start = now;
            true
        } else {
            false
        }
    }

    pub(crate) fn has_capacity(&self) -> bool {
        self.count < self.capacity
    }

    /// Reset if due, then report whether a permit could be taken.
    pub(crate) fn check_and_reset(&mut self, now: Instant) -> bool {
        self.reset_if_due(now);
        self.has_capacity()
    }

    pub(crate) fn consume(&mut self) {
        self.count += 1;
    }

    /// Time left in the current interval, zero once it has run out.
    pub(crate) fn time_until_reset(&self, now: Instant) -> Duration {
        self.interval.saturating_sub(self.elapsed(now))
    }

    /// How long until this window has room again. Zero if it has room now.
    pub(crate) fn remaining_time(&self, now: Instant) -> Duration {
        if self.has_capacity() {
            return Duration::ZERO;
        }
        self.time_until_reset(now)
    }

    /// Time from `now` until the evenly spaced slot of the next unreserved
    /// permit. Zero if that slot has already passed.
    pub(crate) fn next_slot_delay(&self, now: Instant) -> Duration {
        // count < capacity, so the offset stays within the interval
        let offset = self.even_spacing * self.count;
        offset.saturating_sub(self.elapsed(now))
    }

    /// Permits used and time until reset as seen at `now`, without resetting.
    pub(crate) fn observe(&self, now: Instant) -> (u32, Duration) {
        if self.is_due(now) {
            (0, Duration::ZERO)
        } else {
            (self.count, self.time_until_reset(now))
        }
    }
}
