//! Identity cache for users observed by the client.
//!
//! | Type | Description |
//! |------|-------------|
//! | [`IdentityCache`] | Map from user id to the shared merged record |
//! | [`UserRecord`] | Merged view of one user |
//! | [`UserSnapshot`] | Partial view from one source |
//! | [`UserHandle`] | Shared reference to a cached record |
//!
//! # Merge Rule
//!
//! For a given id, a field's last known non-empty value is never replaced
//! by an empty value from a later, less complete snapshot. Conflicting
//! non-empty values resolve last-write-wins per field.

// ============================================================================
// Submodules
// ============================================================================

/// Cache map and lookup operations.
pub mod identity;

/// Records, snapshots and the merge rule.
pub mod record;

// ============================================================================
// Re-exports
// ============================================================================

pub use identity::IdentityCache;
pub use record::{UserHandle, UserRecord, UserSnapshot};
