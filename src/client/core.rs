//! Client: the embedding surface.
//!
//! A [`Client`] owns one identity cache, one dispatcher, one REST client and
//! at most one live gateway session. Clones share all of them.
//!
//! # Example
//!
//! ```no_run
//! use guilded_client::{Client, EventKind};
//!
//! # async fn example() -> guilded_client::Result<()> {
//! let client = Client::builder().token("bot-token").build()?;
//!
//! client.subscribe(EventKind::MessageCreated, |dispatch| {
//!     if let Some(message) = dispatch.event.message() {
//!         println!("{}", message.content);
//!     }
//! });
//!
//! client.login().await?;
//! # Ok(())
//! # }
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::sync::{Arc, Weak};
use std::time::Duration;

use parking_lot::RwLock;
use tokio::sync::{Mutex as AsyncMutex, mpsc};
use tracing::{debug, info};

use crate::cache::{IdentityCache, UserHandle};
use crate::error::{Error, Result};
use crate::gateway::{
    Dispatch, EventDispatcher, EventKind, SessionController, SessionHandle, SessionStatus,
};
use crate::identifiers::{ChannelId, ServerId, SubscriptionId, UserId};
use crate::model::{Member, Message};
use crate::rest::{MessageContent, RestClient};
use crate::transport::Connector;

use super::builder::ClientBuilder;
use super::options::GatewayOptions;

// ============================================================================
// Types
// ============================================================================

/// Shared client state.
pub(crate) struct ClientInner {
    /// Gateway WebSocket URL.
    gateway_url: String,

    /// Session configuration.
    options: GatewayOptions,

    /// REST API client.
    rest: RestClient,

    /// Shared identity cache.
    cache: IdentityCache,

    /// Subscribers and routing.
    dispatcher: EventDispatcher,

    /// Opens gateway connections.
    connector: Arc<dyn Connector>,

    /// Current session, if logged in.
    session: RwLock<Option<SessionHandle>>,

    /// Serializes `login` and `close`.
    login_gate: AsyncMutex<()>,
}

/// Parts assembled by [`ClientBuilder`].
pub(crate) struct ClientParts {
    pub gateway_url: String,
    pub options: GatewayOptions,
    pub rest: RestClient,
    pub cache: IdentityCache,
    pub connector: Arc<dyn Connector>,
}

// ============================================================================
// SessionRef
// ============================================================================

/// Weak back-reference from events to the client that produced them.
///
/// Holding one never keeps the client alive.
#[derive(Clone)]
pub struct SessionRef {
    inner: Weak<ClientInner>,
}

impl SessionRef {
    /// A reference that never resolves.
    #[must_use]
    pub fn detached() -> Self {
        Self { inner: Weak::new() }
    }

    /// Resolves the client.
    ///
    /// # Errors
    ///
    /// [`Error::SessionClosed`] if the client has been dropped.
    pub fn client(&self) -> Result<Client> {
        self.inner
            .upgrade()
            .map(|inner| Client { inner })
            .ok_or(Error::SessionClosed)
    }

    /// Returns `true` while the client is alive.
    #[inline]
    #[must_use]
    pub fn is_attached(&self) -> bool {
        self.inner.strong_count() > 0
    }
}

impl fmt::Debug for SessionRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionRef")
            .field("attached", &self.is_attached())
            .finish()
    }
}

// ============================================================================
// Client
// ============================================================================

/// Guilded bot client.
///
/// Cheap to clone. Dropping the last clone closes the session.
#[derive(Clone)]
pub struct Client {
    /// Shared inner state.
    pub(crate) inner: Arc<ClientInner>,
}

impl fmt::Debug for Client {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Client")
            .field("gateway_url", &self.inner.gateway_url)
            .field("api_base_url", &self.inner.rest.base_url())
            .field("status", &self.status())
            .field("cached_users", &self.inner.cache.len())
            .finish_non_exhaustive()
    }
}

impl Client {
    /// Creates a configuration builder.
    #[inline]
    #[must_use]
    pub fn builder() -> ClientBuilder {
        ClientBuilder::new()
    }

    pub(crate) fn from_parts(parts: ClientParts) -> Self {
        let ClientParts {
            gateway_url,
            options,
            rest,
            cache,
            connector,
        } = parts;

        let inner = Arc::new_cyclic(|weak| ClientInner {
            dispatcher: EventDispatcher::new(cache.clone(), SessionRef { inner: weak.clone() }),
            gateway_url,
            options,
            rest,
            cache,
            connector,
            session: RwLock::new(None),
            login_gate: AsyncMutex::new(()),
        });

        Self { inner }
    }

    // ========================================================================
    // Session
    // ========================================================================

    /// Opens the gateway session.
    ///
    /// Returns the running session if one is already open. Subscribe before
    /// calling this to see the `Ready` event.
    ///
    /// # Errors
    ///
    /// - [`Error::Authentication`] if the gateway rejected the token
    /// - [`Error::Config`] if the gateway options are invalid
    pub async fn login(&self) -> Result<SessionHandle> {
        let _gate = self.inner.login_gate.lock().await;

        let existing = self.inner.session.read().clone();
        if let Some(handle) = existing
            && !handle.is_closed()
        {
            debug!(session = %handle.uuid(), "Session already open");
            return Ok(handle);
        }

        info!(gateway_url = %self.inner.gateway_url, "Logging in");
        let handle = SessionController::connect(
            Arc::clone(&self.inner.connector),
            self.inner.dispatcher.clone(),
            self.inner.options.clone(),
        )
        .await?;

        *self.inner.session.write() = Some(handle.clone());
        Ok(handle)
    }

    /// Closes the session, if any, and waits for it to finish.
    ///
    /// A login in progress completes first and its session is closed.
    pub async fn close(&self) {
        let _gate = self.inner.login_gate.lock().await;

        let handle = self.inner.session.write().take();
        if let Some(handle) = handle {
            handle.close().await;
        }
    }

    /// Returns the session status; `Closed` when not logged in.
    #[must_use]
    pub fn status(&self) -> SessionStatus {
        self.inner
            .session
            .read()
            .as_ref()
            .map_or(SessionStatus::Closed, SessionHandle::status)
    }

    /// Returns the current session handle.
    #[must_use]
    pub fn session(&self) -> Option<SessionHandle> {
        self.inner.session.read().clone()
    }

    /// Returns the bot's own user once the session has been ready.
    #[must_use]
    pub fn user(&self) -> Option<UserHandle> {
        let id = self.session()?.self_user_id()?;
        self.inner.cache.get(&id)
    }

    /// Time since the session became ready, while it is ready.
    #[must_use]
    pub fn uptime(&self) -> Option<Duration> {
        self.session()?.uptime()
    }

    // ========================================================================
    // Accessors
    // ========================================================================

    /// Returns the identity cache.
    #[inline]
    #[must_use]
    pub fn cache(&self) -> &IdentityCache {
        &self.inner.cache
    }

    /// Returns the REST client.
    #[inline]
    #[must_use]
    pub fn rest(&self) -> &RestClient {
        &self.inner.rest
    }

    /// Returns the event dispatcher.
    #[inline]
    #[must_use]
    pub fn dispatcher(&self) -> &EventDispatcher {
        &self.inner.dispatcher
    }

    /// Returns the gateway options.
    #[inline]
    #[must_use]
    pub fn options(&self) -> &GatewayOptions {
        &self.inner.options
    }

    /// Returns the gateway URL.
    #[inline]
    #[must_use]
    pub fn gateway_url(&self) -> &str {
        &self.inner.gateway_url
    }

    // ========================================================================
    // Subscriptions
    // ========================================================================

    /// Registers `handler` for events of `kind`.
    pub fn subscribe<F>(&self, kind: EventKind, handler: F) -> SubscriptionId
    where
        F: Fn(&Dispatch) + Send + Sync + 'static,
    {
        self.inner.dispatcher.subscribe(kind, handler)
    }

    /// Registers `handler` for every event.
    pub fn subscribe_all<F>(&self, handler: F) -> SubscriptionId
    where
        F: Fn(&Dispatch) + Send + Sync + 'static,
    {
        self.inner.dispatcher.subscribe_all(handler)
    }

    /// Removes a subscription.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.inner.dispatcher.unsubscribe(id)
    }

    /// Returns a channel receiving events of `kind`, or all events.
    #[must_use]
    pub fn events(&self, kind: Option<EventKind>) -> (SubscriptionId, mpsc::UnboundedReceiver<Dispatch>) {
        self.inner.dispatcher.stream(kind)
    }

    // ========================================================================
    // REST
    // ========================================================================

    /// Posts a message to `channel`.
    ///
    /// # Errors
    ///
    /// - [`Error::Config`] if the content is empty
    /// - [`Error::Rest`] if the API rejects the message
    pub async fn send_message(
        &self,
        channel: &ChannelId,
        content: impl Into<MessageContent>,
    ) -> Result<Message> {
        let raw = self.inner.rest.create_message(channel, &content.into()).await?;
        Message::from_payload(&raw, &self.inner.cache)
    }

    /// Fetches a server member and merges the profile into the cache.
    ///
    /// Returns `Ok(None)` when the API answers with an error envelope.
    ///
    /// # Errors
    ///
    /// Transport-level HTTP errors, or [`Error::Decode`] for a member
    /// without a user id.
    pub async fn fetch_member(&self, server: &ServerId, user: &UserId) -> Result<Option<Member>> {
        let Some(raw) = self.inner.rest.get_member(server, user).await? else {
            return Ok(None);
        };
        Member::from_payload(&raw, Some(server), &self.inner.cache).map(Some)
    }

    /// Fetches a user's full profile through the member endpoint.
    ///
    /// # Errors
    ///
    /// Same as [`fetch_member`](Self::fetch_member).
    pub async fn fetch_user(&self, server: &ServerId, user: &UserId) -> Result<Option<UserHandle>> {
        Ok(self.fetch_member(server, user).await?.map(|member| member.user))
    }
}

// ============================================================================
// Tests
// ============================================================================
