//! Client entry point.
//!
//! # Components
//!
//! | Type | Description |
//! |------|-------------|
//! | [`Client`] | Owns the cache, dispatcher, REST client and session |
//! | [`ClientBuilder`] | Fluent configuration builder |
//! | [`GatewayOptions`] | Reconnect, heartbeat and timeout settings |
//! | [`SessionRef`] | Weak back-reference carried by events |

// ============================================================================
// Submodules
// ============================================================================

/// REST-backed user accessors.
mod accessors;

/// Fluent builder for client configuration.
pub mod builder;

/// Core client implementation.
pub mod core;

/// Gateway session options.
pub mod options;

// ============================================================================
// Re-exports
// ============================================================================

pub use builder::{ClientBuilder, DEFAULT_API_BASE_URL, DEFAULT_GATEWAY_URL};
pub use core::{Client, SessionRef};
pub use options::GatewayOptions;
