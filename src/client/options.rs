//! Gateway session options.
//!
//! Controls reconnection, heartbeat tolerance and timeouts.
//!
//! # Example
//!
//! ```ignore
//! use std::time::Duration;
//! use guilded_client::GatewayOptions;
//!
//! let options = GatewayOptions::new()
//!     .with_max_reconnect_attempts(10)
//!     .with_heartbeat_grace(Duration::from_secs(5));
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::time::Duration;

use crate::error::{Error, Result};
use crate::gateway::ReconnectPolicy;

// ============================================================================
// Constants
// ============================================================================

/// Delay unit for reconnect backoff; attempt `n` waits `n` units.
pub const DEFAULT_RECONNECT_BASE_DELAY: Duration = Duration::from_millis(5000);

/// Slack added to the heartbeat interval before a missing ack is fatal.
pub const DEFAULT_HEARTBEAT_GRACE: Duration = Duration::from_millis(2500);

/// Timeout for opening the socket.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(30);

/// Timeout for the ready frame after the socket opens.
pub const DEFAULT_READY_TIMEOUT: Duration = Duration::from_secs(30);

// ============================================================================
// GatewayOptions
// ============================================================================

/// Gateway session configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GatewayOptions {
    /// Consecutive failed reconnects before giving up; `None` retries forever.
    pub max_reconnect_attempts: Option<u32>,

    /// Backoff unit between reconnects.
    pub reconnect_base_delay: Duration,

    /// Slack on top of the heartbeat interval.
    pub heartbeat_grace: Duration,

    /// Timeout for opening the socket.
    pub connect_timeout: Duration,

    /// Timeout for the ready frame.
    pub ready_timeout: Duration,
}

impl Default for GatewayOptions {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// Constructors
// ============================================================================

impl GatewayOptions {
    /// Creates options with default settings.
    #[inline]
    #[must_use]
    pub const fn new() -> Self {
        Self {
            max_reconnect_attempts: None,
            reconnect_base_delay: DEFAULT_RECONNECT_BASE_DELAY,
            heartbeat_grace: DEFAULT_HEARTBEAT_GRACE,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            ready_timeout: DEFAULT_READY_TIMEOUT,
        }
    }
}

// ============================================================================
// Builder Methods
// ============================================================================

impl GatewayOptions {
    /// Gives up after `attempts` consecutive failed reconnects.
    #[inline]
    #[must_use]
    pub fn with_max_reconnect_attempts(mut self, attempts: u32) -> Self {
        self.max_reconnect_attempts = Some(attempts);
        self
    }

    /// Retries forever.
    #[inline]
    #[must_use]
    pub fn with_unlimited_reconnects(mut self) -> Self {
        self.max_reconnect_attempts = None;
        self
    }

    /// Sets the backoff unit.
    #[inline]
    #[must_use]
    pub fn with_reconnect_base_delay(mut self, delay: Duration) -> Self {
        self.reconnect_base_delay = delay;
        self
    }

    /// Sets the heartbeat grace period.
    #[inline]
    #[must_use]
    pub fn with_heartbeat_grace(mut self, grace: Duration) -> Self {
        self.heartbeat_grace = grace;
        self
    }

    /// Sets the socket open timeout.
    #[inline]
    #[must_use]
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Sets the ready frame timeout.
    #[inline]
    #[must_use]
    pub fn with_ready_timeout(mut self, timeout: Duration) -> Self {
        self.ready_timeout = timeout;
        self
    }
}

// ============================================================================
// Accessors
// ============================================================================

impl GatewayOptions {
    /// Returns the reconnect policy these options describe.
    #[inline]
    #[must_use]
    pub fn reconnect_policy(&self) -> ReconnectPolicy {
        ReconnectPolicy::new(self.reconnect_base_delay, self.max_reconnect_attempts)
    }

    /// Checks that all durations are usable.
    ///
    /// # Errors
    ///
    /// [`Error::Config`] if a timeout or the backoff unit is zero.
    pub fn validate(&self) -> Result<()> {
        let durations = [
            ("reconnect_base_delay", self.reconnect_base_delay),
            ("connect_timeout", self.connect_timeout),
            ("ready_timeout", self.ready_timeout),
        ];

        match durations.iter().find(|(_, value)| value.is_zero()) {
            Some((name, _)) => Err(Error::config(format!("{name} must be greater than zero"))),
            None => Ok(()),
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let options = GatewayOptions::new();
        assert_eq!(options.max_reconnect_attempts, None);
        assert_eq!(options.reconnect_base_delay, Duration::from_millis(5000));
        assert_eq!(options.heartbeat_grace, Duration::from_millis(2500));
        assert_eq!(options.connect_timeout, Duration::from_secs(30));
        assert_eq!(options, GatewayOptions::default());
        assert!(options.validate().is_ok());
    }

    #[test]
    fn test_builder_chain() {
        let options = GatewayOptions::new()
            .with_max_reconnect_attempts(3)
            .with_reconnect_base_delay(Duration::from_secs(1))
            .with_ready_timeout(Duration::from_secs(5));

        assert_eq!(options.max_reconnect_attempts, Some(3));
        assert_eq!(options.ready_timeout, Duration::from_secs(5));
        assert_eq!(
            options.with_unlimited_reconnects().max_reconnect_attempts,
            None
        );
    }

    #[test]
    fn test_zero_timeout_is_rejected() {
        let err = GatewayOptions::new()
            .with_connect_timeout(Duration::ZERO)
            .validate()
            .unwrap_err();
        assert!(err.to_string().contains("connect_timeout"));
    }

    #[test]
    fn test_zero_grace_is_allowed() {
        let options = GatewayOptions::new().with_heartbeat_grace(Duration::ZERO);
        assert!(options.validate().is_ok());
    }
}
