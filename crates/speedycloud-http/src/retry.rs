//! Bounded retry policy for transport failures.

use std::ops::RangeInclusive;
use std::time::Duration;

use speedycloud_core::{ClientConfig, TransportError};

/// Attempts that are followed by a backoff pause when they fail at the
/// connection level.
const BACKOFF_ATTEMPTS: RangeInclusive<u32> = 2..=3;

/// How many times a request is tried and when the executor pauses between tries.
///
/// Every attempt runs on a connection that has not failed before. After a
/// connection-level failure (reset, refused, timeout) on attempt 2 or 3 the
/// executor sleeps for `backoff` before the next attempt; every other retry
/// starts at once.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    max_attempts: u32,
    backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(5, Duration::from_secs(1))
    }
}

impl RetryPolicy {
    /// A policy trying at most `max_attempts` times (at least once).
    #[must_use]
    pub fn new(max_attempts: u32, backoff: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            backoff,
        }
    }

    /// Policy taken from the client configuration.
    #[must_use]
    pub fn from_config(config: &ClientConfig) -> Self {
        Self::new(config.max_attempts, config.retry_backoff())
    }

    /// Total attempts per logical request.
    #[must_use]
    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Pause to take after `attempt` (1-based) failed with `error`, if any.
    #[must_use]
    pub fn backoff_after(&self, attempt: u32, error: &TransportError) -> Option<Duration> {
        (error.is_connection_level()
            && BACKOFF_ATTEMPTS.contains(&attempt)
            && attempt < self.max_attempts
            && !self.backoff.is_zero())
        .then_some(self.backoff)
    }
}
