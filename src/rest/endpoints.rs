//! REST endpoint paths.
//!
//! | Operation | Method | Path |
//! |-----------|--------|------|
//! | Create message | `POST` | `/channels/{channelId}/messages` |
//! | Update message | `PUT` | `/channels/{channelId}/messages/{messageId}` |
//! | Delete message | `DELETE` | `/channels/{channelId}/messages/{messageId}` |
//! | Add reaction | `PUT` | `/channels/{channelId}/content/{messageId}/emotes/{emoteId}` |
//! | Get member | `GET` | `/servers/{serverId}/members/{userId}` |

// ============================================================================
// Imports
// ============================================================================

use urlencoding::encode;

use crate::identifiers::{ChannelId, EmoteId, MessageId, ServerId, UserId};

// ============================================================================
// Endpoints
// ============================================================================

/// Builds absolute endpoint URLs from an API base.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Endpoints {
    base: String,
}

impl Endpoints {
    pub(crate) fn new(base: &str) -> Self {
        Self {
            base: base.trim_end_matches('/').to_string(),
        }
    }

    pub(crate) fn base(&self) -> &str {
        &self.base
    }

    pub(crate) fn channel_messages(&self, channel: &ChannelId) -> String {
        format!("{}/channels/{}/messages", self.base, encode(channel.as_str()))
    }

    pub(crate) fn message(&self, channel: &ChannelId, message: &MessageId) -> String {
        format!(
            "{}/channels/{}/messages/{}",
            self.base,
            encode(channel.as_str()),
            encode(message.as_str())
        )
    }

    pub(crate) fn message_emote(
        &self,
        channel: &ChannelId,
        message: &MessageId,
        emote: EmoteId,
    ) -> String {
        format!(
            "{}/channels/{}/content/{}/emotes/{emote}",
            self.base,
            encode(channel.as_str()),
            encode(message.as_str())
        )
    }

    pub(crate) fn server_member(&self, server: &ServerId, user: &UserId) -> String {
        format!(
            "{}/servers/{}/members/{}",
            self.base,
            encode(server.as_str()),
            encode(user.as_str())
        )
    }
}

// ============================================================================
// Tests
// ============================================================================
