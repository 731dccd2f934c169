//! Outgoing message bodies.

// ============================================================================
// Imports
// ============================================================================

use serde::Serialize;
use serde_json::Value;

use crate::error::{Error, Result};
use crate::identifiers::MessageId;

// ============================================================================
// MessageContent
// ============================================================================

/// Body of a create or update message request.
///
/// Embeds are passed through as JSON objects.
///
/// # Example
///
/// ```ignore
/// let content = MessageContent::new("deploy finished").silent();
/// client.send_message(&channel_id, content).await?;
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageContent {
    /// Message text.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    /// Only visible to mentioned users.
    pub is_private: bool,
    /// Does not notify mentioned users.
    pub is_silent: bool,
    /// Messages this one replies to.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub reply_message_ids: Vec<MessageId>,
    /// Embed objects.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub embeds: Vec<Value>,
}

impl MessageContent {
    /// Creates a body with `text`.
    #[must_use]
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            content: Some(text.into()),
            ..Self::default()
        }
    }

    /// Marks the message private.
    #[must_use]
    pub fn private(mut self) -> Self {
        self.is_private = true;
        self
    }

    /// Marks the message silent.
    #[must_use]
    pub fn silent(mut self) -> Self {
        self.is_silent = true;
        self
    }

    /// Adds a message to reply to.
    #[must_use]
    pub fn reply_to(mut self, message_id: MessageId) -> Self {
        if !self.reply_message_ids.contains(&message_id) {
            self.reply_message_ids.push(message_id);
        }
        self
    }

    /// Adds an embed object.
    #[must_use]
    pub fn with_embed(mut self, embed: Value) -> Self {
        self.embeds.push(embed);
        self
    }

    /// Checks that the body has text or at least one embed.
    ///
    /// # Errors
    ///
    /// [`Error::Config`] if the body is empty.
    pub fn validate(&self) -> Result<()> {
        let has_text = self.content.as_deref().is_some_and(|text| !text.trim().is_empty());
        if has_text || !self.embeds.is_empty() {
            Ok(())
        } else {
            Err(Error::config("Message needs content or an embed"))
        }
    }
}

impl From<&str> for MessageContent {
    fn from(text: &str) -> Self {
        Self::new(text)
    }
}

impl From<String> for MessageContent {
    fn from(text: String) -> Self {
        Self::new(text)
    }
}

// ============================================================================
// Tests
// ============================================================================
