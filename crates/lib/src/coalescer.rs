//! Throttle + debounce composition over the scroll stream.
//!
//! Scroll events arrive far too often to write each one. The [`Coalescer`]
//! turns them into two time-shaped signals:
//!
//! - **sample**: once scrolling has been quiet for `throttle_delay`, read the
//!   current offset;
//! - **commit**: once no new sample has been taken for `debounce_delay`,
//!   hand the latest sample to the store.
//!
//! The coalescer owns its two deadlines and never reads a clock. Callers pass
//! `now` in and ask for [`next_deadline`](Coalescer::next_deadline) to know
//! when to poll again.

use std::time::Duration;

use tokio::time::Instant;
use tracing::trace;

/// Deadline state for one page's scroll stream.
#[derive(Debug, Clone)]
pub struct Coalescer {
    throttle_delay: Duration,
    debounce_delay: Duration,
    throttle: Option<Instant>,
    debounce: Option<Instant>,
    sample: Option<u64>,
}

impl Coalescer {
    pub fn new(throttle_delay: Duration, debounce_delay: Duration) -> Self {
        Self {
            throttle_delay,
            debounce_delay,
            throttle: None,
            debounce: None,
            sample: None,
        }
    }

    /// Records a raw scroll trigger.
    ///
    /// Re-arms the throttle deadline, replacing any pending one, so a single
    /// sample is taken once the stream goes quiet.
    pub fn trigger(&mut self, now: Instant) {
        self.throttle = Some(now + self.throttle_delay);
    }

    /// Fires whichever deadlines are due at `now`.
    ///
    /// A due throttle reads the offset through `read_offset` and re-arms the
    /// debounce deadline. A due debounce yields the offset to commit.
    pub fn poll(&mut self, now: Instant, read_offset: impl FnOnce() -> u64) -> Option<u64> {
        if self.throttle.is_some_and(|deadline| deadline <= now) {
            self.throttle = None;
            let offset = read_offset();
            self.sample = Some(offset);
            self.debounce = Some(now + self.debounce_delay);
            trace!(offset, "Sampled scroll offset");
        }

        if self.debounce.is_some_and(|deadline| deadline <= now) {
            self.debounce = None;
            return self.sample;
        }
        None
    }

    /// Commits immediately, for exit signals.
    ///
    /// A scroll still waiting on the throttle is sampled now rather than lost.
    /// Both deadlines are cancelled so no late commit follows. Returns `None`
    /// if nothing was ever sampled.
    pub fn flush(&mut self, read_offset: impl FnOnce() -> u64) -> Option<u64> {
        if self.throttle.take().is_some() {
            self.sample = Some(read_offset());
        }
        self.debounce = None;
        self.sample
    }

    /// Cancels both deadlines and forgets the last sample.
    pub fn reset(&mut self) {
        self.throttle = None;
        self.debounce = None;
        self.sample = None;
    }

    /// Earliest armed deadline, if any.
    pub fn next_deadline(&self) -> Option<Instant> {
        match (self.throttle, self.debounce) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        }
    }

    /// Most recent sample.
    pub fn last_sample(&self) -> Option<u64> {
        self.sample
    }

    pub fn is_throttle_armed(&self) -> bool {
        self.throttle.is_some()
    }

    pub fn is_debounce_armed(&self) -> bool {
        self.debounce.is_some()
    }
}
