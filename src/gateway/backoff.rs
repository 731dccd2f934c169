//! Reconnect backoff.
//!
//! Attempt `n` (starting at 1) waits `n × base`. The counter counts
//! consecutive failures since the session was last ready; once it reaches
//! the configured maximum no further attempt is scheduled.

// ============================================================================
// Imports
// ============================================================================

use std::time::Duration;

// ============================================================================
// ReconnectPolicy
// ============================================================================

/// Linear backoff with an optional attempt cap.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReconnectPolicy {
    base_delay: Duration,
    max_attempts: Option<u32>,
}

impl ReconnectPolicy {
    /// Creates a policy; `max_attempts = None` retries forever.
    #[inline]
    #[must_use]
    pub const fn new(base_delay: Duration, max_attempts: Option<u32>) -> Self {
        Self {
            base_delay,
            max_attempts,
        }
    }

    /// Returns the delay before attempt `attempt` (1-based).
    #[inline]
    #[must_use]
    pub fn delay_for(&self, attempt: u32) -> Duration {
        self.base_delay.saturating_mul(attempt)
    }

    /// Returns `true` once `failed` consecutive failures use up the budget.
    #[inline]
    #[must_use]
    pub fn is_exhausted(&self, failed: u32) -> bool {
        self.max_attempts.is_some_and(|max| failed >= max)
    }

    /// Returns the delay before the next attempt after `failed` consecutive
    /// failures, or `None` when the budget is used up.
    #[must_use]
    pub fn next_delay(&self, failed: u32) -> Option<Duration> {
        if self.is_exhausted(failed) {
            None
        } else {
            Some(self.delay_for(failed.saturating_add(1)))
        }
    }

    /// Returns the attempt cap.
    #[inline]
    #[must_use]
    pub fn max_attempts(&self) -> Option<u32> {
        self.max_attempts
    }
}

// ============================================================================
// Tests
// ============================================================================
