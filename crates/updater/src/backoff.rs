//! Capped exponential backoff for the queue poller.

use std::time::Duration;

/// Delay before the first retry
pub const DEFAULT_INITIAL_DELAY: Duration = Duration::from_secs(1);

/// Upper bound on any single delay
pub const DEFAULT_MAX_DELAY: Duration = Duration::from_secs(60);

/// Doubling delay that saturates at `max` and resets after a success.
#[derive(Debug, Clone)]
pub struct Backoff {
    initial: Duration,
    max: Duration,
    current: Duration,
}

impl Backoff {
    #[must_use]
    pub fn new(initial: Duration, max: Duration) -> Self {
        let initial = initial.min(max);
        Self {
            initial,
            max,
            current: initial,
        }
    }

    /// Delay to wait now; the following call returns double, up to the cap.
    pub fn next_delay(&mut self) -> Duration {
        let delay = self.current;
        self.current = self.current.saturating_mul(2).min(self.max);
        delay
    }

    pub fn reset(&mut self) {
        self.current = self.initial;
    }
}

impl Default for Backoff {
    fn default() -> Self {
        Self::new(DEFAULT_INITIAL_DELAY, DEFAULT_MAX_DELAY)
    }
}
