//! Reconnect backoff

use rand::Rng;
use std::time::Duration;

/// Exponential backoff with jitter
///
/// The delay ceiling doubles per attempt (`base * 2^attempt`) up to `max`;
/// the actual delay is drawn from `[ceiling / 2, ceiling]`.
#[derive(Debug, Clone)]
pub struct Backoff {
    base: Duration,
    max: Duration,
    attempt: u32,
}

impl Backoff {
    #[must_use]
    pub fn new(base: Duration, max: Duration) -> Self {
        Self {
            base,
            max: max.max(base),
            attempt: 0,
        }
    }

    /// Upper bound of the delay for `attempt` (0-based)
    pub fn ceiling(&self, attempt: u32) -> Duration {
        2u32.checked_pow(attempt)
            .and_then(|factor| self.base.checked_mul(factor))
            .map_or(self.max, |delay| delay.min(self.max))
    }

    /// Delay before the next attempt
    pub fn next_delay<R: Rng>(&mut self, rng: &mut R) -> Duration {
        let ceiling = self.ceiling(self.attempt);
        self.attempt = self.attempt.saturating_add(1);
        let floor = ceiling / 2;
        if ceiling <= floor {
            return ceiling;
        }
        rng.gen_range(floor..=ceiling)
    }

    /// Forget previous failures
    pub fn reset(&mut self) {
        self.attempt = 0;
    }

    pub fn attempt(&self) -> u32 {
        self.attempt
    }
}
