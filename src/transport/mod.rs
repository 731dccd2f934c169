//! Gateway transport layer.
//!
//! This module adapts a WebSocket library to the small interface the
//! session controller needs.
//!
//! # Architecture
//!
//! ```text
//! ┌───────────────────┐                         ┌─────────────────┐
//! │ SessionController │        WebSocket        │                 │
//! │                   │◄───────────────────────►│ Guilded gateway │
//! │  Connector        │   wss://…/websocket/v1  │                 │
//! │  → Transport      │                         │                 │
//! └───────────────────┘                         └─────────────────┘
//! ```
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `socket` | [`Transport`] and [`Connector`] traits |
//! | `websocket` | tokio-tungstenite implementation |

// ============================================================================
// Submodules
// ============================================================================

/// Transport and connector traits.
pub mod socket;

/// WebSocket connector backed by tokio-tungstenite.
pub mod websocket;

#[cfg(test)]
pub(crate) mod mock;

// ============================================================================
// Re-exports
// ============================================================================

pub use socket::{Connector, Inbound, Transport};
pub use websocket::WsConnector;
