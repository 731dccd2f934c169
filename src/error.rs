//! Error types for the Guilded client.
//!
//! This module defines all error types used throughout the crate.
//!
//! # Usage
//!
//! All fallible operations return [`Result<T>`] which uses [`Error`]:
//!
//! ```ignore
//! use guilded_client::{Client, Result};
//!
//! async fn example(client: &Client) -> Result<()> {
//!     client.login().await?;
//!     Ok(())
//! }
//! ```
//!
//! # Error Categories
//!
//! | Category | Variants | Policy |
//! |----------|----------|--------|
//! | Configuration | [`Error::Config`] | returned from builders |
//! | Authentication | [`Error::Authentication`] | fatal, never retried |
//! | Transport | [`Error::Connection`], [`Error::ConnectionTimeout`], [`Error::ConnectionClosed`], [`Error::HeartbeatTimeout`] | retried with backoff |
//! | Lifecycle | [`Error::ReconnectExhausted`], [`Error::SessionClosed`] | surfaced once |
//! | Decode | [`Error::Decode`] | per frame, logged and dropped |
//! | REST | [`Error::Rest`] | returned to the caller only |
//! | External | [`Error::Io`], [`Error::Json`], [`Error::WebSocket`], [`Error::Http`] | wrapped |

// ============================================================================
// Imports
// ============================================================================

use std::io::Error as IoError;
use std::result::Result as StdResult;

use thiserror::Error;
use tokio_tungstenite::tungstenite::Error as WsError;

// ============================================================================
// Result Alias
// ============================================================================

/// Result type alias using crate [`enum@Error`].
///
/// All fallible operations in this crate return this type.
pub type Result<T> = StdResult<T, Error>;

// ============================================================================
// Error Enum
// ============================================================================

/// Main error type for the crate.
///
/// Each variant includes relevant context for debugging.
#[derive(Error, Debug)]
pub enum Error {
    // ========================================================================
    // Configuration Errors
    // ========================================================================
    /// Configuration error.
    ///
    /// Returned when client configuration is invalid.
    #[error("Configuration error: {message}")]
    Config {
        /// Description of the configuration error.
        message: String,
    },

    // ========================================================================
    // Authentication Errors
    // ========================================================================
    /// The gateway rejected the bearer token.
    ///
    /// Fatal: the session stops and no reconnect is scheduled.
    #[error("Authentication rejected (HTTP {status}): check that the bot token is valid")]
    Authentication {
        /// HTTP status returned by the handshake.
        status: u16,
    },

    // ========================================================================
    // Transport Errors
    // ========================================================================
    /// WebSocket connection failed or was dropped abnormally.
    #[error("Connection failed: {message}")]
    Connection {
        /// Description of the connection error.
        message: String,
    },

    /// Timed out opening the socket or waiting for the ready frame.
    #[error("Connection timeout after {timeout_ms}ms")]
    ConnectionTimeout {
        /// Milliseconds waited before timeout.
        timeout_ms: u64,
    },

    /// WebSocket connection closed by the remote end.
    #[error("Connection closed")]
    ConnectionClosed,

    /// No heartbeat acknowledgement within the allowed window.
    #[error("No heartbeat ack for {elapsed_ms}ms (limit {limit_ms}ms)")]
    HeartbeatTimeout {
        /// Milliseconds since the oldest unacknowledged ping.
        elapsed_ms: u64,
        /// Heartbeat interval plus grace period.
        limit_ms: u64,
    },

    // ========================================================================
    // Lifecycle Errors
    // ========================================================================
    /// Reconnection gave up after the configured number of attempts.
    #[error("Gave up reconnecting after {attempts} attempts")]
    ReconnectExhausted {
        /// Consecutive failed attempts.
        attempts: u32,
    },

    /// The session or client backing this handle is gone.
    #[error("Session closed")]
    SessionClosed,

    // ========================================================================
    // Decode Errors
    // ========================================================================
    /// A gateway frame or payload could not be decoded.
    #[error("Decode error: {message}")]
    Decode {
        /// Description of what was malformed.
        message: String,
    },

    // ========================================================================
    // REST Errors
    // ========================================================================
    /// The REST API answered with an error envelope or status.
    #[error("REST error {code}: {message}")]
    Rest {
        /// Error code from the envelope (or the HTTP status).
        code: String,
        /// Error message from the envelope.
        message: String,
    },

    // ========================================================================
    // External Errors
    // ========================================================================
    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] IoError),

    /// JSON serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// WebSocket error.
    #[error("WebSocket error: {0}")]
    WebSocket(#[from] WsError),

    /// HTTP client error.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

// ============================================================================
// Error Constructors
// ============================================================================

impl Error {
    /// Creates a configuration error.
    #[inline]
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Creates an authentication error.
    #[inline]
    pub fn authentication(status: u16) -> Self {
        Self::Authentication { status }
    }

    /// Creates a connection error.
    #[inline]
    pub fn connection(message: impl Into<String>) -> Self {
        Self::Connection {
            message: message.into(),
        }
    }

    /// Creates a connection timeout error.
    #[inline]
    pub fn connection_timeout(timeout_ms: u64) -> Self {
        Self::ConnectionTimeout { timeout_ms }
    }

    /// Creates a heartbeat timeout error.
    #[inline]
    pub fn heartbeat_timeout(elapsed_ms: u64, limit_ms: u64) -> Self {
        Self::HeartbeatTimeout {
            elapsed_ms,
            limit_ms,
        }
    }

    /// Creates a reconnect exhausted error.
    #[inline]
    pub fn reconnect_exhausted(attempts: u32) -> Self {
        Self::ReconnectExhausted { attempts }
    }

    /// Creates a decode error.
    #[inline]
    pub fn decode(message: impl Into<String>) -> Self {
        Self::Decode {
            message: message.into(),
        }
    }

    /// Creates a REST error.
    #[inline]
    pub fn rest(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Rest {
            code: code.into(),
            message: message.into(),
        }
    }
}

// ============================================================================
// Error Predicates
// ============================================================================

impl Error {
    /// Returns `true` if this error must stop the session for good.
    #[inline]
    #[must_use]
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::Authentication { .. } | Self::ReconnectExhausted { .. } | Self::Config { .. }
        )
    }

    /// Returns `true` if the session should reconnect after this error.
    #[inline]
    #[must_use]
    pub fn is_retriable(&self) -> bool {
        self.is_connection_error()
    }

    /// Returns `true` if this is a transport-level error.
    #[inline]
    #[must_use]
    pub fn is_connection_error(&self) -> bool {
        matches!(
            self,
            Self::Connection { .. }
                | Self::ConnectionTimeout { .. }
                | Self::ConnectionClosed
                | Self::HeartbeatTimeout { .. }
                | Self::WebSocket(_)
                | Self::Io(_)
        )
    }

    /// Returns `true` if this is a timeout error.
    #[inline]
    #[must_use]
    pub fn is_timeout(&self) -> bool {
        matches!(
            self,
            Self::ConnectionTimeout { .. } | Self::HeartbeatTimeout { .. }
        )
    }

    /// Returns `true` if this is an authentication rejection.
    #[inline]
    #[must_use]
    pub fn is_authentication(&self) -> bool {
        matches!(self, Self::Authentication { .. })
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use std::io::ErrorKind;

    #[test]
    fn test_error_display() {
        let err = Error::connection("failed to connect");
        assert_eq!(err.to_string(), "Connection failed: failed to connect");
    }

    #[test]
    fn test_authentication_is_fatal_not_retriable() {
        let err = Error::authentication(401);
        assert!(err.is_fatal());
        assert!(!err.is_retriable());
        assert!(err.is_authentication());
        assert!(err.to_string().contains("401"));
    }

    #[test]
    fn test_transport_errors_are_retriable() {
        let errors = [
            Error::connection("reset"),
            Error::connection_timeout(30_000),
            Error::ConnectionClosed,
            Error::heartbeat_timeout(20_000, 12_500),
        ];

        for err in errors {
            assert!(err.is_retriable(), "{err} should be retriable");
            assert!(!err.is_fatal(), "{err} should not be fatal");
        }
    }

    #[test]
    fn test_heartbeat_timeout_is_timeout() {
        assert!(Error::heartbeat_timeout(1, 1).is_timeout());
        assert!(!Error::ConnectionClosed.is_timeout());
    }

    #[test]
    fn test_local_errors_are_neither_fatal_nor_retriable() {
        let decode = Error::decode("bad json");
        let rest = Error::rest("NotFound", "member not found");

        assert!(!decode.is_fatal() && !decode.is_retriable());
        assert!(!rest.is_fatal() && !rest.is_retriable());
        assert_eq!(rest.to_string(), "REST error NotFound: member not found");
    }

    #[test]
    fn test_reconnect_exhausted_is_fatal() {
        let err = Error::reconnect_exhausted(5);
        assert!(err.is_fatal());
        assert_eq!(err.to_string(), "Gave up reconnecting after 5 attempts");
    }

    #[test]
    fn test_from_io_error() {
        let io_err = IoError::new(ErrorKind::ConnectionReset, "reset");
        let err: Error = io_err.into();
        assert!(matches!(err, Error::Io(_)));
        assert!(err.is_retriable());
    }

    #[test]
    fn test_from_json_error() {
        let json_err = serde_json::from_str::<String>("invalid").unwrap_err();
        let err: Error = json_err.into();
        assert!(matches!(err, Error::Json(_)));
    }
}
