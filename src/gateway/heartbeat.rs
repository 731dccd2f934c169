//! Heartbeat bookkeeping.
//!
//! The monitor is pure state; the session owns the timer and calls
//! [`HeartbeatMonitor::on_tick`] on every tick. A connection is dead once
//! the oldest unacknowledged ping is older than `interval + grace`.

// ============================================================================
// Imports
// ============================================================================

use std::time::Duration;

use tokio::time::Instant;

// ============================================================================
// HeartbeatAction
// ============================================================================

/// What the session should do on a timer tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeartbeatAction {
    /// Send the next ping.
    SendPing,
    /// No ack arrived in time; drop the connection.
    Timeout {
        /// Age of the oldest unacknowledged ping.
        elapsed: Duration,
        /// Interval plus grace.
        limit: Duration,
    },
}

// ============================================================================
// HeartbeatMonitor
// ============================================================================

/// Tracks pings and acks for one connection.
#[derive(Debug, Clone)]
pub struct HeartbeatMonitor {
    interval: Duration,
    grace: Duration,
    last_sent: Option<Instant>,
    last_ack: Option<Instant>,
    awaiting_since: Option<Instant>,
}

impl HeartbeatMonitor {
    /// Creates a monitor for `interval` with `grace` slack.
    #[must_use]
    pub fn new(interval: Duration, grace: Duration) -> Self {
        Self {
            interval,
            grace,
            last_sent: None,
            last_ack: None,
            awaiting_since: None,
        }
    }

    /// Heartbeat period.
    #[inline]
    #[must_use]
    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Longest tolerated wait for an ack.
    #[inline]
    #[must_use]
    pub fn limit(&self) -> Duration {
        self.interval.saturating_add(self.grace)
    }

    /// Time the last ping went out.
    #[inline]
    #[must_use]
    pub fn last_sent(&self) -> Option<Instant> {
        self.last_sent
    }

    /// Time the last ack arrived.
    #[inline]
    #[must_use]
    pub fn last_ack(&self) -> Option<Instant> {
        self.last_ack
    }

    /// Records a ping sent at `now`.
    pub fn on_ping_sent(&mut self, now: Instant) {
        self.last_sent = Some(now);
        self.awaiting_since.get_or_insert(now);
    }

    /// Records an ack received at `now`.
    pub fn on_ack(&mut self, now: Instant) {
        self.last_ack = Some(now);
        self.awaiting_since = None;
    }

    /// Decides what to do on a timer tick at `now`.
    #[must_use]
    pub fn on_tick(&self, now: Instant) -> HeartbeatAction {
        if let Some(since) = self.awaiting_since {
            let elapsed = now.saturating_duration_since(since);
            if elapsed > self.limit() {
                return HeartbeatAction::Timeout {
                    elapsed,
                    limit: self.limit(),
                };
            }
        }
        HeartbeatAction::SendPing
    }
}

// ============================================================================
// Tests
// ============================================================================
