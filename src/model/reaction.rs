//! Message reactions.

// ============================================================================
// Imports
// ============================================================================

use serde::Deserialize;
use serde_json::Value;

use crate::cache::{IdentityCache, UserHandle};
use crate::error::{Error, Result};
use crate::identifiers::{ChannelId, EmoteId, MessageId, ServerId, UserId};

// ============================================================================
// Constants
// ============================================================================

/// Image CDN that serves emote images.
pub const EMOTE_CDN_BASE: &str = "https://img.guildedcdn.com";

// ============================================================================
// Wire Shape
// ============================================================================

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawReaction {
    channel_id: ChannelId,
    message_id: MessageId,
    created_by: UserId,
    emote: Emote,
}

// ============================================================================
// Emote
// ============================================================================

/// An emote used in a reaction.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Emote {
    /// Emote id.
    pub id: EmoteId,
    /// Emote name.
    #[serde(default)]
    pub name: String,
    /// Image URL as sent by the gateway; usually a CDN path.
    #[serde(default)]
    pub url: String,
}

impl Emote {
    /// Returns the absolute image URL.
    #[must_use]
    pub fn image_url(&self) -> String {
        if self.url.starts_with("http://") || self.url.starts_with("https://") {
            self.url.clone()
        } else {
            format!("{EMOTE_CDN_BASE}{}", self.url)
        }
    }
}

// ============================================================================
// Reaction
// ============================================================================

/// A reaction added to or removed from a message.
#[derive(Debug, Clone)]
pub struct Reaction {
    /// Server of the channel.
    pub server_id: Option<ServerId>,
    /// Channel of the message.
    pub channel_id: ChannelId,
    /// Message reacted to.
    pub message_id: MessageId,
    /// User that reacted.
    pub user: UserHandle,
    /// The emote.
    pub emote: Emote,
    /// Raw reaction object.
    pub raw: Value,
}

impl Reaction {
    /// Decodes the data of a `ChannelMessageReaction*` frame.
    ///
    /// # Errors
    ///
    /// [`Error::Decode`] if the reaction object is incomplete.
    pub fn from_event(data: &Value, cache: &IdentityCache) -> Result<Self> {
        let raw = &data["reaction"];
        let reaction = RawReaction::deserialize(raw)
            .map_err(|e| Error::decode(format!("invalid reaction payload: {e}")))?;

        let server_id = data
            .get("serverId")
            .and_then(Value::as_str)
            .map(ServerId::new);

        Ok(Self {
            user: cache.observe(&reaction.created_by, server_id.as_ref()),
            server_id,
            channel_id: reaction.channel_id,
            message_id: reaction.message_id,
            emote: reaction.emote,
            raw: raw.clone(),
        })
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use serde_json::json;

    #[test]
    fn test_reaction_created() {
        let cache = IdentityCache::new();
        let data = json!({
            "serverId": "S1",
            "reaction": {
                "channelId": "C1",
                "messageId": "M1",
                "createdBy": "U1",
                "emote": { "id": 90001164, "name": "thumbsup", "url": "/asset/Emojis/thumbsup.webp" }
            }
        });

        let reaction = Reaction::from_event(&data, &cache).expect("valid");

        assert_eq!(reaction.message_id, MessageId::new("M1"));
        assert_eq!(reaction.emote.id, EmoteId::new(90_001_164));
        assert_eq!(
            reaction.emote.image_url(),
            "https://img.guildedcdn.com/asset/Emojis/thumbsup.webp"
        );
        assert_eq!(reaction.user.server_id(), Some(ServerId::new("S1")));
    }

    #[test]
    fn test_absolute_emote_url_is_kept() {
        let emote = Emote {
            id: EmoteId::new(1),
            name: "custom".to_string(),
            url: "https://cdn.example/custom.png".to_string(),
        };
        assert_eq!(emote.image_url(), "https://cdn.example/custom.png");
    }

    #[test]
    fn test_reaction_without_emote_is_error() {
        let cache = IdentityCache::new();
        let data = json!({ "reaction": { "channelId": "C1", "messageId": "M1", "createdBy": "U1" } });
        assert!(Reaction::from_event(&data, &cache).is_err());
    }
}
