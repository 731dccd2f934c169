//! Webhooks.

// ============================================================================
// Imports
// ============================================================================

use std::fmt;

use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::Value;

use crate::cache::record::parse_timestamp;
use crate::cache::{IdentityCache, UserHandle};
use crate::error::{Error, Result};
use crate::identifiers::{ChannelId, ServerId, UserId, WebhookId};

// ============================================================================
// Webhook
// ============================================================================

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawWebhook {
    id: WebhookId,
    name: Option<String>,
    server_id: Option<ServerId>,
    channel_id: Option<ChannelId>,
    created_at: Option<String>,
    created_by: Option<UserId>,
    deleted_at: Option<String>,
    token: Option<String>,
}

/// A channel webhook from `TeamWebhookCreated` / `TeamWebhookUpdated`.
#[derive(Clone)]
pub struct Webhook {
    /// Webhook id.
    pub id: WebhookId,
    /// Display name.
    pub name: Option<String>,
    /// Server the webhook belongs to.
    pub server_id: Option<ServerId>,
    /// Channel the webhook posts to.
    pub channel_id: Option<ChannelId>,
    /// Creation time.
    pub created_at: Option<DateTime<Utc>>,
    /// User that created the webhook.
    pub creator: Option<UserHandle>,
    /// Deletion time.
    pub deleted_at: Option<DateTime<Utc>>,
    /// Execution token, when the payload carries one.
    pub token: Option<String>,
}

impl Webhook {
    /// Decodes the data of a webhook frame.
    ///
    /// # Errors
    ///
    /// [`Error::Decode`] if `webhook.id` is missing.
    pub fn from_event(data: &Value, cache: &IdentityCache) -> Result<Self> {
        let raw = RawWebhook::deserialize(&data["webhook"])
            .map_err(|e| Error::decode(format!("invalid webhook payload: {e}")))?;

        let server_id = raw.server_id.or_else(|| {
            data.get("serverId")
                .and_then(Value::as_str)
                .map(ServerId::new)
        });

        let creator = raw
            .created_by
            .as_ref()
            .map(|user_id| cache.observe(user_id, server_id.as_ref()));

        Ok(Self {
            id: raw.id,
            name: raw.name,
            server_id,
            channel_id: raw.channel_id,
            created_at: raw.created_at.as_deref().and_then(parse_timestamp),
            creator,
            deleted_at: raw.deleted_at.as_deref().and_then(parse_timestamp),
            token: raw.token,
        })
    }

    /// Returns `true` if the webhook has been deleted.
    #[inline]
    #[must_use]
    pub fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }
}

impl fmt::Debug for Webhook {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Webhook")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("server_id", &self.server_id)
            .field("channel_id", &self.channel_id)
            .field("deleted_at", &self.deleted_at)
            .finish_non_exhaustive()
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
    fn test_webhook_created() {
        let cache = IdentityCache::new();
        let data = json!({
            "serverId": "S1",
            "webhook": {
                "id": "W1",
                "name": "deploys",
                "serverId": "S1",
                "channelId": "C1",
                "createdAt": "2022-01-01T00:00:00Z",
                "createdBy": "U1",
                "token": "hook-secret"
            }
        });

        let webhook = Webhook::from_event(&data, &cache).expect("valid");

        assert_eq!(webhook.id, WebhookId::new("W1"));
        assert_eq!(webhook.channel_id, Some(ChannelId::new("C1")));
        assert!(!webhook.is_deleted());
        assert_eq!(webhook.creator.as_ref().map(UserHandle::id), Some(UserId::new("U1")));
        assert!(!format!("{webhook:?}").contains("hook-secret"));
    }

    #[test]
    fn test_webhook_server_falls_back_to_event() {
        let cache = IdentityCache::new();
        let data = json!({ "serverId": "S2", "webhook": { "id": "W1", "deletedAt": "2022-01-02T00:00:00Z" } });

        let webhook = Webhook::from_event(&data, &cache).expect("valid");

        assert_eq!(webhook.server_id, Some(ServerId::new("S2")));
        assert!(webhook.is_deleted());
        assert!(webhook.creator.is_none());
    }

    #[test]
    fn test_webhook_without_id_is_error() {
        let cache = IdentityCache::new();
        assert!(Webhook::from_event(&json!({ "webhook": {} }), &cache).is_err());
    }
}
