//! Guilded bot client: gateway session, event dispatch and identity cache.
//!
//! # Architecture
//!
//! - **Session**: one task per session owns the WebSocket, sends heartbeat
//!   pings and reconnects with linear backoff
//! - **Decoder**: each text frame becomes a control frame, a domain frame or
//!   nothing; bad frames never stop the session
//! - **Dispatcher**: domain frames become typed [`Event`]s delivered to
//!   subscribers, with the bot's own messages suppressed
//! - **Identity cache**: every author, member and REST profile merges into one
//!   shared record per user id; an empty value never overwrites a known one
//!
//! # Quick Start
//!
//! ```no_run
//! use guilded_client::{Client, Event, EventKind, Result};
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let client = Client::builder().token("bot-token").build()?;
//!     let (_, mut events) = client.events(Some(EventKind::MessageCreated));
//!
//!     client.login().await?;
//!
//!     while let Some(dispatch) = events.recv().await {
//!         if let Event::MessageCreated(message) = &dispatch.event
//!             && message.content == "!ping"
//!         {
//!             let client = dispatch.session.client()?;
//!             message.reply(&client, "pong").await?;
//!         }
//!     }
//!     Ok(())
//! }
//! ```
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`cache`] | Identity cache and user records |
//! | [`client`] | [`Client`], [`ClientBuilder`], [`GatewayOptions`] |
//! | [`error`] | Error types and [`Result`] alias |
//! | [`gateway`] | Session lifecycle, heartbeat, dispatch |
//! | [`identifiers`] | Type-safe ID wrappers |
//! | [`model`] | Decoded event payloads |
//! | [`protocol`] | Gateway frame decoding |
//! | [`rest`] | REST API client |
//! | [`transport`] | WebSocket transport |

// ============================================================================
// Modules
// ============================================================================

/// Identity cache and user records.
pub mod cache;

/// Client entry point and configuration.
///
/// Use [`Client::builder()`] to create a configured client.
pub mod client;

/// Error types and result aliases.
///
/// All fallible operations return [`Result<T>`] which uses [`Error`].
pub mod error;

/// Session lifecycle, heartbeat and event dispatch.
pub mod gateway;

/// Type-safe identifiers.
///
/// Newtype wrappers prevent mixing incompatible IDs at compile time.
pub mod identifiers;

/// Decoded event payloads.
pub mod model;

/// Gateway frame types and decoding.
pub mod protocol;

/// REST API client.
pub mod rest;

/// WebSocket transport layer.
pub mod transport;

// ============================================================================
// Re-exports
// ============================================================================

// Cache types
pub use cache::{IdentityCache, UserHandle, UserRecord, UserSnapshot};

// Client types
pub use client::{Client, ClientBuilder, GatewayOptions, SessionRef};

// Error types
pub use error::{Error, Result};

// Gateway types
pub use gateway::{
    Dispatch, Event, EventDispatcher, EventKind, Session, SessionHandle, SessionStatus,
};

// Identifier types
pub use identifiers::{ChannelId, EmoteId, MessageId, ServerId, SubscriptionId, UserId, WebhookId};

// Model types
pub use model::{
    Emote, Member, MemberBan, MemberRemoved, MemberRoles, MemberUpdate, Message, Reaction,
    RolesUpdate, Webhook,
};

// REST types
pub use rest::{MessageContent, RestClient};
