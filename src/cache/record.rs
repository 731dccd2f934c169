//! User records and partial snapshots.
//!
//! A [`UserSnapshot`] is what one source (a gateway payload, a REST member
//! lookup) knows about a user at one point in time. A [`UserRecord`] is the
//! accumulated view for one id. Snapshots fold into records with
//! [`UserRecord::merge`], which never replaces a known value with an empty
//! one.
//!
//! Empty means absent, JSON `null`, a blank string, or a timestamp that does
//! not parse.

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use serde_json::{Map, Value};

use crate::identifiers::{ServerId, UserId};

// ============================================================================
// Constants
// ============================================================================

/// Base URL of the default avatar images.
const DEFAULT_AVATAR_BASE: &str = "https://img.guildedcdn.com/asset/DefaultUserAvatars/profile_";

/// Number of default avatar images.
const DEFAULT_AVATAR_COUNT: u32 = 4;

/// Raw keys mapped to named fields; everything else lands in `extra`.
const KNOWN_KEYS: &[&str] = &[
    "id",
    "name",
    "avatar",
    "banner",
    "type",
    "botId",
    "createdAt",
    "createdBy",
    "serverId",
    "server",
    "token",
];

// ============================================================================
// UserSnapshot
// ============================================================================

/// A partial view of a user as observed from one source.
///
/// Every field is optional; `None` means "this source did not say".
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UserSnapshot {
    /// Display name.
    pub username: Option<String>,
    /// Avatar image URL.
    pub avatar_url: Option<String>,
    /// Profile banner URL.
    pub banner_url: Option<String>,
    /// Whether the user is a bot.
    pub is_bot: Option<bool>,
    /// Bot id, when the user is a bot.
    pub bot_id: Option<String>,
    /// Raw user type (`"user"` or `"bot"`).
    pub user_type: Option<String>,
    /// Account creation time.
    pub created_at: Option<DateTime<Utc>>,
    /// For bots, the user that created the bot.
    pub created_by: Option<UserId>,
    /// Server the user was observed in.
    pub server_id: Option<ServerId>,
    /// Any other non-empty fields carried by the raw payload.
    pub extra: Map<String, Value>,
}

impl UserSnapshot {
    /// Creates an empty snapshot.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the display name.
    #[must_use]
    pub fn with_username(mut self, username: impl Into<String>) -> Self {
        self.username = non_blank(username.into());
        self
    }

    /// Sets the avatar URL.
    #[must_use]
    pub fn with_avatar_url(mut self, url: impl Into<String>) -> Self {
        self.avatar_url = non_blank(url.into());
        self
    }

    /// Sets the banner URL.
    #[must_use]
    pub fn with_banner_url(mut self, url: impl Into<String>) -> Self {
        self.banner_url = non_blank(url.into());
        self
    }

    /// Sets the bot flag.
    #[must_use]
    pub fn with_bot(mut self, is_bot: bool) -> Self {
        self.is_bot = Some(is_bot);
        self
    }

    /// Sets the creation time.
    #[must_use]
    pub fn with_created_at(mut self, created_at: DateTime<Utc>) -> Self {
        self.created_at = Some(created_at);
        self
    }

    /// Sets the server the user was observed in.
    #[must_use]
    pub fn with_server_id(mut self, server_id: impl Into<ServerId>) -> Self {
        self.server_id = Some(server_id.into());
        self
    }

    /// Adds an extra raw field. Empty values are dropped.
    #[must_use]
    pub fn with_extra(mut self, key: impl Into<String>, value: Value) -> Self {
        if is_present(&value) {
            self.extra.insert(key.into(), value);
        }
        self
    }

    /// Returns `true` if the snapshot carries no non-empty field.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.username.is_none()
            && self.avatar_url.is_none()
            && self.banner_url.is_none()
            && self.is_bot.is_none()
            && self.bot_id.is_none()
            && self.user_type.is_none()
            && self.created_at.is_none()
            && self.created_by.is_none()
            && self.server_id.is_none()
            && self.extra.is_empty()
    }

    /// Parses a raw user object as sent by the gateway or REST API.
    ///
    /// Returns `None` if the object has no usable `id`.
    ///
    /// | Raw key | Field |
    /// |---------|-------|
    /// | `name` | `username` |
    /// | `avatar` | `avatar_url` |
    /// | `banner` | `banner_url` |
    /// | `type`, `botId` | `user_type`, `bot_id`, `is_bot` |
    /// | `createdAt` | `created_at` |
    /// | `createdBy` | `created_by` |
    /// | `serverId`, `server.id` | `server_id` |
    ///
    /// `token` is never retained.
    #[must_use]
    pub fn from_raw(raw: &Value) -> Option<(UserId, Self)> {
        let object = raw.as_object()?;
        let id = object.get("id").and_then(string_of).map(UserId::new)?;

        let user_type = object.get("type").and_then(string_of);
        let bot_id = object.get("botId").and_then(string_of);
        let is_bot = match (&bot_id, &user_type) {
            (Some(_), _) => Some(true),
            (None, Some(kind)) => Some(kind.eq_ignore_ascii_case("bot")),
            (None, None) => None,
        };

        let server_id = object
            .get("serverId")
            .and_then(string_of)
            .or_else(|| {
                object
                    .get("server")
                    .and_then(|server| server.get("id"))
                    .and_then(string_of)
            })
            .map(ServerId::new);

        let extra = object
            .iter()
            .filter(|(key, value)| !KNOWN_KEYS.contains(&key.as_str()) && is_present(value))
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect();

        let snapshot = Self {
            username: object.get("name").and_then(string_of),
            avatar_url: object.get("avatar").and_then(string_of),
            banner_url: object.get("banner").and_then(string_of),
            is_bot,
            bot_id,
            user_type,
            created_at: object.get("createdAt").and_then(Value::as_str).and_then(parse_timestamp),
            created_by: object.get("createdBy").and_then(string_of).map(UserId::new),
            server_id,
            extra,
        };

        Some((id, snapshot))
    }
}

// ============================================================================
// UserRecord
// ============================================================================

/// The merged, authoritative view of one user.
#[derive(Debug, Clone, PartialEq)]
pub struct UserRecord {
    /// Record key; never changes after creation.
    id: UserId,
    /// Display name.
    pub username: Option<String>,
    /// Avatar image URL.
    pub avatar_url: Option<String>,
    /// Profile banner URL.
    pub banner_url: Option<String>,
    /// Whether the user is a bot.
    pub is_bot: Option<bool>,
    /// Bot id, when the user is a bot.
    pub bot_id: Option<String>,
    /// Raw user type.
    pub user_type: Option<String>,
    /// Account creation time.
    pub created_at: Option<DateTime<Utc>>,
    /// For bots, the user that created the bot.
    pub created_by: Option<UserId>,
    /// Last server the user was observed in.
    pub server_id: Option<ServerId>,
    /// Other raw fields accumulated from snapshots.
    pub extra: Map<String, Value>,
}

impl UserRecord {
    /// Creates an empty record for `id`.
    #[must_use]
    pub fn new(id: UserId) -> Self {
        Self {
            id,
            username: None,
            avatar_url: None,
            banner_url: None,
            is_bot: None,
            bot_id: None,
            user_type: None,
            created_at: None,
            created_by: None,
            server_id: None,
            extra: Map::new(),
        }
    }

    /// Creates a record for `id` seeded from a snapshot.
    #[must_use]
    pub fn from_snapshot(id: UserId, snapshot: &UserSnapshot) -> Self {
        let mut record = Self::new(id);
        record.merge(snapshot);
        record
    }

    /// Returns the record key.
    #[inline]
    #[must_use]
    pub fn id(&self) -> &UserId {
        &self.id
    }

    /// Folds `incoming` into this record.
    ///
    /// Each non-empty field of `incoming` overwrites the stored value when
    /// the stored value is absent or different. Fields `incoming` does not
    /// carry are left untouched, so a known value is never erased.
    ///
    /// Returns the number of fields that changed.
    pub fn merge(&mut self, incoming: &UserSnapshot) -> usize {
        let updated = [
            merge_field(&mut self.username, &incoming.username),
            merge_field(&mut self.avatar_url, &incoming.avatar_url),
            merge_field(&mut self.banner_url, &incoming.banner_url),
            merge_field(&mut self.is_bot, &incoming.is_bot),
            merge_field(&mut self.bot_id, &incoming.bot_id),
            merge_field(&mut self.user_type, &incoming.user_type),
            merge_field(&mut self.created_at, &incoming.created_at),
            merge_field(&mut self.created_by, &incoming.created_by),
            merge_field(&mut self.server_id, &incoming.server_id),
        ];

        let mut changed = updated.iter().filter(|&&changed| changed).count();

        for (key, value) in &incoming.extra {
            if is_present(value) && self.extra.get(key) != Some(value) {
                self.extra.insert(key.clone(), value.clone());
                changed += 1;
            }
        }

        changed
    }

    /// Returns the avatar URL, or a default avatar chosen from the id.
    #[must_use]
    pub fn avatar_url_or_default(&self) -> String {
        self.avatar_url
            .clone()
            .unwrap_or_else(|| default_avatar_url(&self.id))
    }
}

// ============================================================================
// UserHandle
// ============================================================================

/// Shared handle to a cached [`UserRecord`].
///
/// Every handle for the same id obtained from one
/// [`IdentityCache`](super::IdentityCache) points at the same record, so
/// merges made through the cache are visible to all holders.
///
/// Do not hold a [`read`](Self::read) guard across calls into the cache.
#[derive(Clone)]
pub struct UserHandle {
    /// Shared record.
    inner: Arc<RwLock<UserRecord>>,
}

impl UserHandle {
    /// Wraps a record in a new handle.
    pub(crate) fn new(record: UserRecord) -> Self {
        Self {
            inner: Arc::new(RwLock::new(record)),
        }
    }

    /// Returns the user id.
    #[must_use]
    pub fn id(&self) -> UserId {
        self.inner.read().id.clone()
    }

    /// Returns the current display name.
    #[must_use]
    pub fn username(&self) -> Option<String> {
        self.inner.read().username.clone()
    }

    /// Returns the current server id, if known.
    #[must_use]
    pub fn server_id(&self) -> Option<ServerId> {
        self.inner.read().server_id.clone()
    }

    /// Returns `true` if the user is known to be a bot.
    #[must_use]
    pub fn is_bot(&self) -> bool {
        self.inner.read().is_bot.unwrap_or(false)
    }

    /// Locks the record for reading.
    pub fn read(&self) -> RwLockReadGuard<'_, UserRecord> {
        self.inner.read()
    }

    /// Returns a detached copy of the current record.
    #[must_use]
    pub fn snapshot(&self) -> UserRecord {
        self.inner.read().clone()
    }

    /// Returns `true` if both handles point at the same record.
    #[inline]
    #[must_use]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    /// Locks the record for writing. Only the cache mutates records.
    pub(crate) fn write(&self) -> RwLockWriteGuard<'_, UserRecord> {
        self.inner.write()
    }
}

impl fmt::Debug for UserHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let record = self.inner.read();
        f.debug_struct("UserHandle")
            .field("id", &record.id)
            .field("username", &record.username)
            .finish_non_exhaustive()
    }
}

// ============================================================================
// Helpers
// ============================================================================

/// Overwrites `slot` with a present, different incoming value.
fn merge_field<T: Clone + PartialEq>(slot: &mut Option<T>, incoming: &Option<T>) -> bool {
    match incoming {
        Some(value) if slot.as_ref() != Some(value) => {
            *slot = Some(value.clone());
            true
        }
        _ => false,
    }
}

/// Returns `true` if a raw JSON value counts as non-empty.
pub(crate) fn is_present(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::String(s) => !s.trim().is_empty(),
        _ => true,
    }
}

/// Extracts a non-blank string (numbers are accepted as ids).
pub(crate) fn string_of(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => non_blank(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Parses an RFC 3339 timestamp; unparsable input is empty.
pub(crate) fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

/// Returns `None` for blank strings.
fn non_blank(value: String) -> Option<String> {
    if value.trim().is_empty() {
        None
    } else {
        Some(value)
    }
}

/// Picks one of the default avatars deterministically from the id.
fn default_avatar_url(id: &UserId) -> String {
    let sum: u32 = id.as_str().bytes().map(u32::from).sum();
    let index = sum % DEFAULT_AVATAR_COUNT + 1;
    format!("{DEFAULT_AVATAR_BASE}{index}.png")
}

// ============================================================================
// Tests
// ============================================================================
