//! Transport abstraction used by the session controller.
//!
//! The controller never touches a WebSocket library directly. It talks to a
//! [`Transport`] produced by a [`Connector`], which lets tests drive the
//! session with scripted frames and paused time.

// ============================================================================
// Imports
// ============================================================================

use async_trait::async_trait;

use crate::error::Result;

// ============================================================================
// Inbound
// ============================================================================

/// A frame received from the gateway.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Inbound {
    /// Text frame.
    Text(String),
    /// Pong answering one of our pings.
    Pong(Vec<u8>),
    /// Close frame.
    Close {
        /// Close code, if one was sent.
        code: Option<u16>,
        /// Close reason.
        reason: String,
    },
}

// ============================================================================
// Transport
// ============================================================================

/// One open gateway connection.
///
/// `recv` must be cancel-safe: the session polls it inside `select!`.
#[async_trait]
pub trait Transport: Send {
    /// Receives the next frame.
    ///
    /// Returns `None` when the stream has ended.
    async fn recv(&mut self) -> Option<Result<Inbound>>;

    /// Sends a WebSocket ping carrying `payload`.
    async fn send_ping(&mut self, payload: Vec<u8>) -> Result<()>;

    /// Closes the connection. Errors while closing are ignored.
    async fn close(&mut self);
}

// ============================================================================
// Connector
// ============================================================================

/// Opens gateway connections.
#[async_trait]
pub trait Connector: Send + Sync {
    /// Opens a new authenticated connection.
    ///
    /// # Errors
    ///
    /// - [`Error::Authentication`](crate::Error::Authentication) if the
    ///   gateway rejected the token
    /// - Any retriable transport error otherwise
    async fn connect(&self) -> Result<Box<dyn Transport>>;
}
