//! HTTP client for the REST API.
//!
//! Every request carries the bearer token and user agent. Responses are
//! read as JSON; a body carrying a `code` field is an error envelope and
//! maps to [`Error::Rest`], as does any non-2xx status.

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::time::Duration;

use reqwest::header::{AUTHORIZATION, HeaderMap, HeaderValue, USER_AGENT};
use reqwest::{Response, StatusCode};
use serde_json::Value;
use tracing::{debug, trace, warn};

use crate::error::{Error, Result};
use crate::identifiers::{ChannelId, EmoteId, MessageId, ServerId, UserId};

use super::content::MessageContent;
use super::endpoints::Endpoints;

// ============================================================================
// Constants
// ============================================================================

/// Longest body excerpt kept in error messages.
const MAX_ERROR_BODY: usize = 200;

// ============================================================================
// RestClient
// ============================================================================

/// Authenticated REST client.
///
/// Cheap to clone; clones share the connection pool.
#[derive(Clone)]
pub struct RestClient {
    http: reqwest::Client,
    endpoints: Endpoints,
}

impl RestClient {
    /// Creates a client for the API at `base_url`.
    ///
    /// # Errors
    ///
    /// - [`Error::Config`] if the token or user agent is not a valid header
    /// - [`Error::Http`] if the HTTP client cannot be built
    pub fn new(
        token: &str,
        base_url: &str,
        user_agent: &str,
        request_timeout: Duration,
    ) -> Result<Self> {
        let mut headers = HeaderMap::new();

        let mut authorization = HeaderValue::from_str(&format!("Bearer {token}"))
            .map_err(|_| Error::config("Token contains characters not allowed in a header"))?;
        authorization.set_sensitive(true);
        headers.insert(AUTHORIZATION, authorization);
        headers.insert(
            USER_AGENT,
            HeaderValue::from_str(user_agent)
                .map_err(|_| Error::config("User agent contains characters not allowed in a header"))?,
        );

        let http = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(request_timeout)
            .build()?;

        Ok(Self {
            http,
            endpoints: Endpoints::new(base_url),
        })
    }

    /// Returns the API base URL.
    #[inline]
    #[must_use]
    pub fn base_url(&self) -> &str {
        self.endpoints.base()
    }

    // ========================================================================
    // Messages
    // ========================================================================

    /// Posts a message to `channel` and returns the created message object.
    ///
    /// # Errors
    ///
    /// - [`Error::Config`] if the body is empty
    /// - [`Error::Rest`] if the API rejects the message
    pub async fn create_message(&self, channel: &ChannelId, content: &MessageContent) -> Result<Value> {
        content.validate()?;
        let url = self.endpoints.channel_messages(channel);
        trace!(%url, "POST message");

        let response = self.http.post(&url).json(content).send().await?;
        let body = read_json(response).await?;
        message_object(body)
    }

    /// Replaces the content of a message and returns the updated object.
    ///
    /// # Errors
    ///
    /// - [`Error::Config`] if the body is empty
    /// - [`Error::Rest`] if the API rejects the edit
    pub async fn update_message(
        &self,
        channel: &ChannelId,
        message: &MessageId,
        content: &MessageContent,
    ) -> Result<Value> {
        content.validate()?;
        let url = self.endpoints.message(channel, message);
        trace!(%url, "PUT message");

        let response = self.http.put(&url).json(content).send().await?;
        let body = read_json(response).await?;
        message_object(body)
    }

    /// Deletes a message.
    ///
    /// # Errors
    ///
    /// [`Error::Rest`] if the API rejects the deletion.
    pub async fn delete_message(&self, channel: &ChannelId, message: &MessageId) -> Result<()> {
        let url = self.endpoints.message(channel, message);
        trace!(%url, "DELETE message");

        let response = self.http.delete(&url).send().await?;
        read_json(response).await?;
        debug!(channel_id = %channel, message_id = %message, "Deleted message");
        Ok(())
    }

    /// Adds a reaction to a message.
    ///
    /// # Errors
    ///
    /// [`Error::Rest`] if the API rejects the reaction.
    pub async fn add_reaction(&self, channel: &ChannelId, message: &MessageId, emote: EmoteId) -> Result<()> {
        let url = self.endpoints.message_emote(channel, message, emote);
        trace!(%url, "PUT reaction");

        let response = self.http.put(&url).send().await?;
        read_json(response).await?;
        Ok(())
    }

    // ========================================================================
    // Members
    // ========================================================================

    /// Fetches a server member.
    ///
    /// Returns the `member` object, or `None` when the API answers with an
    /// error envelope (unknown server or user).
    ///
    /// # Errors
    ///
    /// Transport-level HTTP errors only.
    pub async fn get_member(&self, server: &ServerId, user: &UserId) -> Result<Option<Value>> {
        let url = self.endpoints.server_member(server, user);
        trace!(%url, "GET member");

        let response = self.http.get(&url).send().await?;
        match read_json(response).await {
            Ok(mut body) => Ok(body.get_mut("member").map(Value::take)),
            Err(Error::Rest { code, message }) => {
                debug!(server_id = %server, user_id = %user, %code, %message, "Member lookup found nothing");
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }
}

impl fmt::Debug for RestClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RestClient")
            .field("base_url", &self.endpoints.base())
            .finish_non_exhaustive()
    }
}

// ============================================================================
// Response Handling
// ============================================================================

/// Reads a response body as JSON, mapping error envelopes and statuses.
async fn read_json(response: Response) -> Result<Value> {
    let status = response.status();
    if status == StatusCode::NO_CONTENT {
        return Ok(Value::Null);
    }

    let text = response.text().await?;
    let body = if text.trim().is_empty() {
        Value::Null
    } else {
        match serde_json::from_str(&text) {
            Ok(body) => body,
            Err(e) if status.is_success() => {
                warn!(status = status.as_u16(), error = %e, "REST response is not JSON");
                return Err(Error::Json(e));
            }
            Err(_) => Value::Null,
        }
    };

    if let Some(code) = body.get("code") {
        let code = code.as_str().map_or_else(|| code.to_string(), str::to_owned);
        let message = body
            .get("message")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();
        warn!(status = status.as_u16(), %code, %message, "REST error envelope");
        return Err(Error::rest(code, message));
    }

    if !status.is_success() {
        warn!(status = status.as_u16(), "REST request failed");
        return Err(Error::rest(status.as_u16().to_string(), excerpt(&text)));
    }

    Ok(body)
}

/// Extracts the `message` object from a create/update response.
fn message_object(mut body: Value) -> Result<Value> {
    match body.get_mut("message").map(Value::take) {
        Some(message) if message.is_object() => Ok(message),
        _ => Err(Error::decode("response without message object")),
    }
}

fn excerpt(text: &str) -> String {
    text.chars().take(MAX_ERROR_BODY).collect()
}

// ============================================================================
// Tests
// ============================================================================
