//! REST API collaborator.
//!
//! The gateway core only needs a handful of calls: message create, update
//! and delete, reactions, and member lookup. Failures are returned to the
//! caller and never reach the gateway loop.
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `client` | [`RestClient`] (reqwest) |
//! | `content` | [`MessageContent`] request bodies |
//! | `endpoints` | Endpoint path builder |

// ============================================================================
// Submodules
// ============================================================================

/// Authenticated HTTP client.
pub mod client;

/// Outgoing message bodies.
pub mod content;

/// Endpoint paths.
pub(crate) mod endpoints;

// ============================================================================
// Re-exports
// ============================================================================

pub use client::RestClient;
pub use content::MessageContent;
