//! Chat messages.
//!
//! Decoded from the `message` object of `ChatMessage*` frames and from REST
//! responses. Actions take an explicit [`Client`] so a message never owns
//! the session it came from.

// ============================================================================
// Imports
// ============================================================================

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

use crate::cache::record::parse_timestamp;
use crate::cache::{IdentityCache, UserHandle};
use crate::client::Client;
use crate::error::{Error, Result};
use crate::identifiers::{ChannelId, EmoteId, MessageId, ServerId, UserId, WebhookId};
use crate::rest::MessageContent;

// ============================================================================
// Constants
// ============================================================================

/// Emote used by [`Message::react_default`].
pub const DEFAULT_REACTION_EMOTE: EmoteId = EmoteId::new(90_001_164);

// ============================================================================
// Wire Shape
// ============================================================================

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawMessage {
    id: MessageId,
    #[serde(rename = "type")]
    message_type: Option<String>,
    server_id: Option<ServerId>,
    channel_id: ChannelId,
    content: Option<String>,
    reply_message_ids: Option<Vec<MessageId>>,
    is_private: Option<bool>,
    is_silent: Option<bool>,
    created_at: Option<String>,
    created_by: Option<UserId>,
    created_by_webhook_id: Option<WebhookId>,
    updated_at: Option<String>,
    deleted_at: Option<String>,
}

// ============================================================================
// Message
// ============================================================================

/// A chat message.
#[derive(Debug, Clone)]
pub struct Message {
    /// Message id.
    pub id: MessageId,
    /// Message type, `"default"` unless the payload says otherwise.
    pub message_type: String,
    /// Server the channel belongs to.
    pub server_id: Option<ServerId>,
    /// Channel the message was posted in.
    pub channel_id: ChannelId,
    /// Text content; empty when the message only carries embeds.
    pub content: String,
    /// Messages this one replies to.
    pub reply_message_ids: Vec<MessageId>,
    /// Whether the message is private.
    pub is_private: bool,
    /// Whether the message was sent silently.
    pub is_silent: bool,
    /// Creation time.
    pub created_at: Option<DateTime<Utc>>,
    /// Author, resolved through the identity cache.
    pub author: Option<UserHandle>,
    /// Webhook that posted the message.
    pub webhook_id: Option<WebhookId>,
    /// Last edit time.
    pub edited_at: Option<DateTime<Utc>>,
    /// Deletion time.
    pub deleted_at: Option<DateTime<Utc>>,
    /// Raw payload.
    pub raw: Value,
}

impl Message {
    /// Decodes a message object, resolving its author through `cache`.
    ///
    /// # Errors
    ///
    /// [`Error::Decode`] if `id` or `channelId` is missing.
    pub fn from_payload(raw: &Value, cache: &IdentityCache) -> Result<Self> {
        let message = RawMessage::deserialize(raw)
            .map_err(|e| Error::decode(format!("invalid message payload: {e}")))?;

        let author = message
            .created_by
            .as_ref()
            .map(|user_id| cache.observe(user_id, message.server_id.as_ref()));

        Ok(Self {
            id: message.id,
            message_type: message.message_type.unwrap_or_else(|| "default".to_string()),
            server_id: message.server_id,
            channel_id: message.channel_id,
            content: message.content.unwrap_or_default(),
            reply_message_ids: message.reply_message_ids.unwrap_or_default(),
            is_private: message.is_private.unwrap_or(false),
            is_silent: message.is_silent.unwrap_or(false),
            created_at: message.created_at.as_deref().and_then(parse_timestamp),
            author,
            webhook_id: message.created_by_webhook_id,
            edited_at: message.updated_at.as_deref().and_then(parse_timestamp),
            deleted_at: message.deleted_at.as_deref().and_then(parse_timestamp),
            raw: raw.clone(),
        })
    }

    /// Returns the author id.
    #[must_use]
    pub fn author_id(&self) -> Option<UserId> {
        self.author.as_ref().map(UserHandle::id)
    }

    /// Returns `true` if the message has been edited.
    #[inline]
    #[must_use]
    pub fn is_edited(&self) -> bool {
        self.edited_at.is_some()
    }

    /// Returns `true` if the message has been deleted.
    #[inline]
    #[must_use]
    pub fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }

    /// Returns `true` if a webhook posted the message.
    #[inline]
    #[must_use]
    pub fn is_webhook(&self) -> bool {
        self.webhook_id.is_some()
    }

    /// Returns `true` if the message replies to other messages.
    #[inline]
    #[must_use]
    pub fn has_replies(&self) -> bool {
        !self.reply_message_ids.is_empty()
    }
}

// ============================================================================
// Actions
// ============================================================================

impl Message {
    /// Posts a reply in the same channel.
    ///
    /// # Errors
    ///
    /// [`Error::Rest`] if the API rejects the message.
    pub async fn reply(&self, client: &Client, content: impl Into<MessageContent>) -> Result<Message> {
        let content = content.into().reply_to(self.id.clone());
        client.send_message(&self.channel_id, content).await
    }

    /// Replaces the content of this message.
    ///
    /// # Errors
    ///
    /// [`Error::Rest`] if the API rejects the edit.
    pub async fn edit(&self, client: &Client, content: impl Into<MessageContent>) -> Result<Message> {
        let raw = client
            .rest()
            .update_message(&self.channel_id, &self.id, &content.into())
            .await?;
        Message::from_payload(&raw, client.cache())
    }

    /// Deletes this message.
    ///
    /// # Errors
    ///
    /// [`Error::Rest`] if the API rejects the deletion.
    pub async fn delete(&self, client: &Client) -> Result<()> {
        client.rest().delete_message(&self.channel_id, &self.id).await
    }

    /// Deletes this message after `delay`.
    ///
    /// # Errors
    ///
    /// [`Error::Rest`] if the API rejects the deletion.
    pub async fn delete_after(&self, client: &Client, delay: Duration) -> Result<()> {
        let delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX);
        debug!(message_id = %self.id, delay_ms, "Scheduled message deletion");
        tokio::time::sleep(delay).await;
        self.delete(client).await
    }

    /// Adds a reaction with `emote`.
    ///
    /// # Errors
    ///
    /// [`Error::Rest`] if the API rejects the reaction.
    pub async fn react(&self, client: &Client, emote: EmoteId) -> Result<()> {
        client.rest().add_reaction(&self.channel_id, &self.id, emote).await
    }

    /// Adds a reaction with [`DEFAULT_REACTION_EMOTE`].
    ///
    /// # Errors
    ///
    /// [`Error::Rest`] if the API rejects the reaction.
    pub async fn react_default(&self, client: &Client) -> Result<()> {
        self.react(client, DEFAULT_REACTION_EMOTE).await
    }

    /// Fetches the author's full profile into the cache.
    ///
    /// Returns `Ok(None)` for messages without an author or server, and when
    /// the member lookup finds nothing.
    ///
    /// # Errors
    ///
    /// Transport-level HTTP errors only.
    pub async fn fetch_author(&self, client: &Client) -> Result<Option<UserHandle>> {
        let (Some(server_id), Some(author_id)) = (&self.server_id, self.author_id()) else {
            return Ok(None);
        };
        client.fetch_user(server_id, &author_id).await
    }
}

// ============================================================================
// Tests
// ============================================================================
