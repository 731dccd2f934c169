//! Identity cache: one merged record per user id.
//!
//! Gateway payloads carry minimal author stubs; REST member lookups carry
//! full profiles. Both feed [`IdentityCache::get_or_create`], which folds
//! them into a single shared record per id without ordering requirements
//! between the sources.
//!
//! # Locking
//!
//! The whole map is guarded by one `RwLock`. `get_or_create` holds the write
//! lock for its read-modify-write, so merges for the same id never
//! interleave.

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::sync::Arc;

use parking_lot::RwLock;
use rustc_hash::FxHashMap;
use serde_json::Value;
use tracing::{debug, trace};

use crate::identifiers::{ServerId, UserId};

use super::record::{UserHandle, UserRecord, UserSnapshot};

// ============================================================================
// IdentityCache
// ============================================================================

/// Map from user id to the merged [`UserRecord`].
///
/// Cloning the cache clones the handle, not the contents: clones share
/// entries. Entries are never evicted.
#[derive(Clone, Default)]
pub struct IdentityCache {
    /// Records by user id.
    users: Arc<RwLock<FxHashMap<UserId, UserHandle>>>,
}

impl IdentityCache {
    /// Creates an empty cache.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the record for `id`, creating or updating it from `snapshot`.
    ///
    /// The first observation creates the record; later observations merge
    /// into it. All callers get the same shared record for a given id.
    pub fn get_or_create(&self, id: &UserId, snapshot: &UserSnapshot) -> UserHandle {
        let mut users = self.users.write();

        if let Some(handle) = users.get(id) {
            let changed = Self::merge(&mut handle.write(), snapshot);
            if changed > 0 {
                trace!(user_id = %id, changed, "Merged user snapshot");
            }
            return handle.clone();
        }

        let handle = UserHandle::new(UserRecord::from_snapshot(id.clone(), snapshot));
        users.insert(id.clone(), handle.clone());
        debug!(user_id = %id, cached = users.len(), "Cached new user");
        handle
    }

    /// Merges `incoming` into `existing`.
    ///
    /// See [`UserRecord::merge`]. Returns the number of changed fields.
    #[inline]
    pub fn merge(existing: &mut UserRecord, incoming: &UserSnapshot) -> usize {
        existing.merge(incoming)
    }

    /// Returns the record for `id` without creating one.
    #[must_use]
    pub fn get(&self, id: &UserId) -> Option<UserHandle> {
        self.users.read().get(id).cloned()
    }

    /// Parses a raw user object and merges it.
    ///
    /// `server_id` is attached when the raw object does not name a server.
    /// Returns `None` if the object has no id.
    pub fn ingest_raw(&self, raw: &Value, server_id: Option<&ServerId>) -> Option<UserHandle> {
        let (id, mut snapshot) = UserSnapshot::from_raw(raw)?;
        if snapshot.server_id.is_none() {
            snapshot.server_id = server_id.cloned();
        }
        Some(self.get_or_create(&id, &snapshot))
    }

    /// Returns a handle for a bare id seen in a payload.
    pub fn observe(&self, id: &UserId, server_id: Option<&ServerId>) -> UserHandle {
        let snapshot = UserSnapshot {
            server_id: server_id.cloned(),
            ..UserSnapshot::default()
        };
        self.get_or_create(id, &snapshot)
    }

    /// Returns `true` if a record exists for `id`.
    #[must_use]
    pub fn contains(&self, id: &UserId) -> bool {
        self.users.read().contains_key(id)
    }

    /// Returns the number of cached users.
    #[must_use]
    pub fn len(&self) -> usize {
        self.users.read().len()
    }

    /// Returns `true` if no user is cached.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.users.read().is_empty()
    }

    /// Returns `true` if both values share the same storage.
    #[inline]
    #[must_use]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.users, &other.users)
    }
}

impl fmt::Debug for IdentityCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IdentityCache")
            .field("len", &self.len())
            .finish()
    }
}

// ============================================================================
// Tests
// ============================================================================
