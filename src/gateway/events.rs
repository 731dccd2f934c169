//! Events published to subscribers.
//!
//! # Event Kinds
//!
//! | Kind | Source |
//! |------|--------|
//! | `Ready` | ready control frame |
//! | `Disconnected` | connection lost (retriable) |
//! | `Reconnecting` | reconnect attempt scheduled |
//! | `Fatal` | authentication rejected or reconnects exhausted |
//! | `Closed` | session reached its terminal state |
//! | `Message*`, `Member*`, `Webhook*`, `Reaction*` | domain frames |

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use crate::cache::UserHandle;
use crate::client::SessionRef;
use crate::error::Error;
use crate::model::{
    Member, MemberBan, MemberRemoved, MemberUpdate, Message, Reaction, RolesUpdate, Webhook,
};

// ============================================================================
// EventKind
// ============================================================================

/// Discriminant of an [`Event`], used to subscribe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    /// Session is ready.
    Ready,
    /// Connection was lost; a reconnect follows.
    Disconnected,
    /// A reconnect attempt is scheduled.
    Reconnecting,
    /// The session stopped for good.
    Fatal,
    /// The session is closed.
    Closed,
    /// A message was posted.
    MessageCreated,
    /// A message was edited.
    MessageUpdated,
    /// A message was deleted.
    MessageDeleted,
    /// A user joined a server.
    MemberJoined,
    /// A user left or was removed from a server.
    MemberLeft,
    /// A user was banned.
    MemberBanned,
    /// A user was unbanned.
    MemberUnbanned,
    /// A member's profile changed.
    MemberUpdated,
    /// Member roles changed.
    MemberRolesUpdated,
    /// A webhook was created.
    WebhookCreated,
    /// A webhook was updated.
    WebhookUpdated,
    /// A reaction was added.
    ReactionAdded,
    /// A reaction was removed.
    ReactionRemoved,
}

impl EventKind {
    /// Returns `true` for kinds produced by domain frames.
    #[inline]
    #[must_use]
    pub const fn is_domain(self) -> bool {
        !self.is_lifecycle()
    }

    /// Returns `true` for session lifecycle kinds.
    #[inline]
    #[must_use]
    pub const fn is_lifecycle(self) -> bool {
        matches!(
            self,
            Self::Ready | Self::Disconnected | Self::Reconnecting | Self::Fatal | Self::Closed
        )
    }

    /// Returns a stable name for logs.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Ready => "ready",
            Self::Disconnected => "disconnected",
            Self::Reconnecting => "reconnecting",
            Self::Fatal => "fatal",
            Self::Closed => "closed",
            Self::MessageCreated => "message_created",
            Self::MessageUpdated => "message_updated",
            Self::MessageDeleted => "message_deleted",
            Self::MemberJoined => "member_joined",
            Self::MemberLeft => "member_left",
            Self::MemberBanned => "member_banned",
            Self::MemberUnbanned => "member_unbanned",
            Self::MemberUpdated => "member_updated",
            Self::MemberRolesUpdated => "member_roles_updated",
            Self::WebhookCreated => "webhook_created",
            Self::WebhookUpdated => "webhook_updated",
            Self::ReactionAdded => "reaction_added",
            Self::ReactionRemoved => "reaction_removed",
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// Event
// ============================================================================

/// A session lifecycle signal or decoded domain event.
#[derive(Debug, Clone)]
pub enum Event {
    /// The session is authenticated and ready.
    Ready {
        /// The bot's own user record.
        user: UserHandle,
        /// Heartbeat period requested by the gateway.
        heartbeat_interval: Duration,
    },
    /// The connection was lost; a reconnect follows.
    Disconnected {
        /// Why the connection was lost.
        error: Arc<Error>,
    },
    /// A reconnect attempt is scheduled.
    Reconnecting {
        /// Attempt number, starting at 1.
        attempt: u32,
        /// Delay before the attempt.
        delay: Duration,
    },
    /// The session stopped and will not reconnect.
    Fatal {
        /// Why the session stopped.
        error: Arc<Error>,
    },
    /// The session is closed.
    Closed,

    /// A message was posted.
    MessageCreated(Message),
    /// A message was edited.
    MessageUpdated(Message),
    /// A message was deleted.
    MessageDeleted(Message),
    /// A user joined a server.
    MemberJoined(Member),
    /// A user left or was removed from a server.
    MemberLeft(MemberRemoved),
    /// A user was banned.
    MemberBanned(MemberBan),
    /// A user was unbanned.
    MemberUnbanned(MemberBan),
    /// A member's profile changed.
    MemberUpdated(MemberUpdate),
    /// Member roles changed.
    MemberRolesUpdated(RolesUpdate),
    /// A webhook was created.
    WebhookCreated(Webhook),
    /// A webhook was updated.
    WebhookUpdated(Webhook),
    /// A reaction was added.
    ReactionAdded(Reaction),
    /// A reaction was removed.
    ReactionRemoved(Reaction),
}

impl Event {
    /// Returns the event's kind.
    #[must_use]
    pub const fn kind(&self) -> EventKind {
        match self {
            Self::Ready { .. } => EventKind::Ready,
            Self::Disconnected { .. } => EventKind::Disconnected,
            Self::Reconnecting { .. } => EventKind::Reconnecting,
            Self::Fatal { .. } => EventKind::Fatal,
            Self::Closed => EventKind::Closed,
            Self::MessageCreated(_) => EventKind::MessageCreated,
            Self::MessageUpdated(_) => EventKind::MessageUpdated,
            Self::MessageDeleted(_) => EventKind::MessageDeleted,
            Self::MemberJoined(_) => EventKind::MemberJoined,
            Self::MemberLeft(_) => EventKind::MemberLeft,
            Self::MemberBanned(_) => EventKind::MemberBanned,
            Self::MemberUnbanned(_) => EventKind::MemberUnbanned,
            Self::MemberUpdated(_) => EventKind::MemberUpdated,
            Self::MemberRolesUpdated(_) => EventKind::MemberRolesUpdated,
            Self::WebhookCreated(_) => EventKind::WebhookCreated,
            Self::WebhookUpdated(_) => EventKind::WebhookUpdated,
            Self::ReactionAdded(_) => EventKind::ReactionAdded,
            Self::ReactionRemoved(_) => EventKind::ReactionRemoved,
        }
    }

    /// Returns the message for message events.
    #[must_use]
    pub fn message(&self) -> Option<&Message> {
        match self {
            Self::MessageCreated(message)
            | Self::MessageUpdated(message)
            | Self::MessageDeleted(message) => Some(message),
            _ => None,
        }
    }
}

// ============================================================================
// Dispatch
// ============================================================================

/// What a subscriber receives: the event plus a way back to the client.
///
/// The session reference is weak; it never keeps the client alive.
#[derive(Debug, Clone)]
pub struct Dispatch {
    /// The event.
    pub event: Event,
    /// Back-reference to the client that produced the event.
    pub session: SessionRef,
}

impl Dispatch {
    /// Returns the event's kind.
    #[inline]
    #[must_use]
    pub fn kind(&self) -> EventKind {
        self.event.kind()
    }
}

// ============================================================================
// Tests
// ============================================================================
