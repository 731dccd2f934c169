//! Decoded domain payloads.
//!
//! | Module | Types |
//! |--------|-------|
//! | `message` | [`Message`] |
//! | `member` | [`Member`], [`MemberRemoved`], [`MemberBan`], [`MemberUpdate`], [`RolesUpdate`] |
//! | `webhook` | [`Webhook`] |
//! | `reaction` | [`Reaction`], [`Emote`] |

// ============================================================================
// Submodules
// ============================================================================

/// Server member payloads.
pub mod member;

/// Chat messages and their actions.
pub mod message;

/// Message reactions.
pub mod reaction;

/// Webhooks.
pub mod webhook;

// ============================================================================
// Re-exports
// ============================================================================

pub use member::{Member, MemberBan, MemberRemoved, MemberRoles, MemberUpdate, RolesUpdate};
pub use message::{DEFAULT_REACTION_EMOTE, Message};
pub use reaction::{EMOTE_CDN_BASE, Emote, Reaction};
pub use webhook::Webhook;
