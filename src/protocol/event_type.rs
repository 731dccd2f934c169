//! Wire event type names.
//!
//! Domain frames name their event in the `t` field. Only the names listed
//! here are decoded; anything else is dropped by the decoder.
//!
//! | Wire name | Variant |
//! |-----------|---------|
//! | `ChatMessageCreated` | [`EventType::ChatMessageCreated`] |
//! | `ChatMessageUpdated` | [`EventType::ChatMessageUpdated`] |
//! | `ChatMessageDeleted` | [`EventType::ChatMessageDeleted`] |
//! | `TeamMemberJoined` | [`EventType::TeamMemberJoined`] |
//! | `TeamMemberRemoved` | [`EventType::TeamMemberRemoved`] |
//! | `TeamMemberBanned` | [`EventType::TeamMemberBanned`] |
//! | `TeamMemberUnbanned` | [`EventType::TeamMemberUnbanned`] |
//! | `TeamMemberUpdated` | [`EventType::TeamMemberUpdated`] |
//! | `teamRolesUpdated` | [`EventType::TeamRolesUpdated`] |
//! | `TeamWebhookCreated` | [`EventType::TeamWebhookCreated`] |
//! | `TeamWebhookUpdated` | [`EventType::TeamWebhookUpdated`] |
//! | `ChannelMessageReactionCreated` | [`EventType::ChannelMessageReactionCreated`] |
//! | `ChannelMessageReactionDeleted` | [`EventType::ChannelMessageReactionDeleted`] |

// ============================================================================
// Imports
// ============================================================================

use std::fmt;

// ============================================================================
// EventType
// ============================================================================

/// A recognized domain frame event name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventType {
    /// A message was posted.
    ChatMessageCreated,
    /// A message was edited.
    ChatMessageUpdated,
    /// A message was deleted.
    ChatMessageDeleted,
    /// A user joined a server.
    TeamMemberJoined,
    /// A user left or was removed from a server.
    TeamMemberRemoved,
    /// A user was banned.
    TeamMemberBanned,
    /// A user was unbanned.
    TeamMemberUnbanned,
    /// A member profile changed.
    TeamMemberUpdated,
    /// Member role assignments changed.
    TeamRolesUpdated,
    /// A webhook was created.
    TeamWebhookCreated,
    /// A webhook was updated.
    TeamWebhookUpdated,
    /// A reaction was added to a message.
    ChannelMessageReactionCreated,
    /// A reaction was removed from a message.
    ChannelMessageReactionDeleted,
}

impl EventType {
    /// All recognized event types.
    pub const ALL: [Self; 13] = [
        Self::ChatMessageCreated,
        Self::ChatMessageUpdated,
        Self::ChatMessageDeleted,
        Self::TeamMemberJoined,
        Self::TeamMemberRemoved,
        Self::TeamMemberBanned,
        Self::TeamMemberUnbanned,
        Self::TeamMemberUpdated,
        Self::TeamRolesUpdated,
        Self::TeamWebhookCreated,
        Self::TeamWebhookUpdated,
        Self::ChannelMessageReactionCreated,
        Self::ChannelMessageReactionDeleted,
    ];

    /// Parses a wire name. Matching is exact (the names are case-sensitive).
    #[must_use]
    pub fn from_wire(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|event_type| event_type.as_str() == name)
    }

    /// Returns the wire name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::ChatMessageCreated => "ChatMessageCreated",
            Self::ChatMessageUpdated => "ChatMessageUpdated",
            Self::ChatMessageDeleted => "ChatMessageDeleted",
            Self::TeamMemberJoined => "TeamMemberJoined",
            Self::TeamMemberRemoved => "TeamMemberRemoved",
            Self::TeamMemberBanned => "TeamMemberBanned",
            Self::TeamMemberUnbanned => "TeamMemberUnbanned",
            Self::TeamMemberUpdated => "TeamMemberUpdated",
            Self::TeamRolesUpdated => "teamRolesUpdated",
            Self::TeamWebhookCreated => "TeamWebhookCreated",
            Self::TeamWebhookUpdated => "TeamWebhookUpdated",
            Self::ChannelMessageReactionCreated => "ChannelMessageReactionCreated",
            Self::ChannelMessageReactionDeleted => "ChannelMessageReactionDeleted",
        }
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// Tests
// ============================================================================
