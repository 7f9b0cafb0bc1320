//! Reconnect backoff with decorrelated jitter.

use std::time::Duration;

use rand::RngExt;

/// Decorrelated-jitter backoff.
///
/// Each delay is drawn uniformly from `[base, previous * 3]` and capped at
/// `max`, so consecutive delays grow on average without synchronising across
/// clients.
#[derive(Clone, Debug)]
pub struct Backoff {
    base_delay: Duration,
    max_delay: Duration,
    last_delay: Duration,
    attempt: u32,
}

impl Backoff {
    /// Create a backoff starting at `base_delay` and capped at `max_delay`.
    pub fn new(base_delay: Duration, max_delay: Duration) -> Self {
        Self {
            base_delay,
            max_delay,
            last_delay: base_delay,
            attempt: 0,
        }
    }

    /// Compute the next delay and increment the attempt counter.
    pub fn next_delay(&mut self) -> Duration {
        self.attempt = self.attempt.saturating_add(1);

        let base = as_millis(self.base_delay);
        let upper = as_millis(self.last_delay).saturating_mul(3).max(base);
        let candidate = if upper == base {
            base
        } else {
            rand::rng().random_range(base..=upper)
        };

        let delay = Duration::from_millis(candidate).min(self.max_delay);
        self.last_delay = delay;
        delay
    }

    /// Reset after a successful connection.
    pub fn reset(&mut self) {
        self.attempt = 0;
        self.last_delay = self.base_delay;
    }

    /// Number of delays handed out since the last reset.
    pub fn attempt_count(&self) -> u32 {
        self.attempt
    }

    /// Replace the base delay (server `retry:` directive).
    pub fn set_base_delay(&mut self, delay: Duration) {
        self.base_delay = delay;
    }

    /// Current base delay.
    pub fn base_delay(&self) -> Duration {
        self.base_delay
    }

    /// Upper bound on any delay.
    pub fn max_delay(&self) -> Duration {
        self.max_delay
    }
}

pub(crate) fn as_millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}
