//! Server member payloads.
//!
//! | Type | Frame |
//! |------|-------|
//! | [`Member`] | `TeamMemberJoined`, REST member lookup |
//! | [`MemberRemoved`] | `TeamMemberRemoved` |
//! | [`MemberBan`] | `TeamMemberBanned`, `TeamMemberUnbanned` |
//! | [`MemberUpdate`] | `TeamMemberUpdated` |
//! | [`RolesUpdate`] | `teamRolesUpdated` |
//!
//! Every user referenced by these payloads is resolved through the
//! identity cache, so subscribers see the shared record.

// ============================================================================
// Imports
// ============================================================================

use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::Value;

use crate::cache::record::{parse_timestamp, string_of};
use crate::cache::{IdentityCache, UserHandle};
use crate::error::{Error, Result};
use crate::identifiers::{ServerId, UserId};

// ============================================================================
// Member
// ============================================================================

/// A user's membership in a server.
#[derive(Debug, Clone)]
pub struct Member {
    /// Server the membership belongs to.
    pub server_id: Option<ServerId>,
    /// The member's user record.
    pub user: UserHandle,
    /// Assigned role ids.
    pub role_ids: Vec<u64>,
    /// Server nickname.
    pub nickname: Option<String>,
    /// Join time.
    pub joined_at: Option<DateTime<Utc>>,
    /// Whether the member owns the server.
    pub is_owner: bool,
    /// Raw member object.
    pub raw: Value,
}

impl Member {
    /// Decodes a member object and merges its user into `cache`.
    ///
    /// `server_id` is used when the object does not carry one.
    ///
    /// # Errors
    ///
    /// [`Error::Decode`] if the object has no user id.
    pub fn from_payload(
        raw: &Value,
        server_id: Option<&ServerId>,
        cache: &IdentityCache,
    ) -> Result<Self> {
        let server_id = raw
            .get("serverId")
            .and_then(string_of)
            .map(ServerId::new)
            .or_else(|| server_id.cloned());

        let user = raw
            .get("user")
            .and_then(|user| cache.ingest_raw(user, server_id.as_ref()))
            .ok_or_else(|| Error::decode("member payload without user id"))?;

        Ok(Self {
            server_id,
            user,
            role_ids: role_ids(raw.get("roleIds")),
            nickname: raw.get("nickname").and_then(string_of),
            joined_at: raw.get("joinedAt").and_then(Value::as_str).and_then(parse_timestamp),
            is_owner: raw.get("isOwner").and_then(Value::as_bool).unwrap_or(false),
            raw: raw.clone(),
        })
    }

    /// Decodes the data of a `TeamMemberJoined` frame.
    ///
    /// # Errors
    ///
    /// [`Error::Decode`] if `member.user.id` is missing.
    pub fn from_event(data: &Value, cache: &IdentityCache) -> Result<Self> {
        let server_id = event_server_id(data);
        Self::from_payload(&data["member"], server_id.as_ref(), cache)
    }
}

// ============================================================================
// MemberRemoved
// ============================================================================

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawMemberRemoved {
    server_id: Option<ServerId>,
    user_id: UserId,
    is_kick: Option<bool>,
    is_ban: Option<bool>,
}

/// A user left or was removed from a server.
#[derive(Debug, Clone)]
pub struct MemberRemoved {
    /// Server the user left.
    pub server_id: Option<ServerId>,
    /// The user.
    pub user: UserHandle,
    /// Whether the user was kicked.
    pub is_kick: bool,
    /// Whether the user was banned.
    pub is_ban: bool,
}

impl MemberRemoved {
    /// Decodes the data of a `TeamMemberRemoved` frame.
    ///
    /// # Errors
    ///
    /// [`Error::Decode`] if `userId` is missing.
    pub fn from_event(data: &Value, cache: &IdentityCache) -> Result<Self> {
        let raw = RawMemberRemoved::deserialize(data)
            .map_err(|e| Error::decode(format!("invalid member removal payload: {e}")))?;

        Ok(Self {
            user: cache.observe(&raw.user_id, raw.server_id.as_ref()),
            server_id: raw.server_id,
            is_kick: raw.is_kick.unwrap_or(false),
            is_ban: raw.is_ban.unwrap_or(false),
        })
    }

    /// Returns `true` if the user left on their own.
    #[inline]
    #[must_use]
    pub fn is_voluntary(&self) -> bool {
        !self.is_kick && !self.is_ban
    }
}

// ============================================================================
// MemberBan
// ============================================================================

/// A ban record.
#[derive(Debug, Clone)]
pub struct MemberBan {
    /// Server the ban applies to.
    pub server_id: Option<ServerId>,
    /// The banned user.
    pub user: UserHandle,
    /// Ban reason.
    pub reason: Option<String>,
    /// Moderator that issued the ban.
    pub banned_by: Option<UserHandle>,
    /// Ban time.
    pub banned_at: Option<DateTime<Utc>>,
}

impl MemberBan {
    /// Decodes the data of a `TeamMemberBanned` or `TeamMemberUnbanned` frame.
    ///
    /// # Errors
    ///
    /// [`Error::Decode`] if `serverMemberBan.user.id` is missing.
    pub fn from_event(data: &Value, cache: &IdentityCache) -> Result<Self> {
        let server_id = event_server_id(data);
        let ban = &data["serverMemberBan"];

        let user = ban
            .get("user")
            .and_then(|user| cache.ingest_raw(user, server_id.as_ref()))
            .ok_or_else(|| Error::decode("ban payload without user id"))?;

        let banned_by = ban
            .get("createdBy")
            .and_then(string_of)
            .map(|id| cache.observe(&UserId::new(id), server_id.as_ref()));

        Ok(Self {
            user,
            reason: ban.get("reason").and_then(string_of),
            banned_by,
            banned_at: ban.get("createdAt").and_then(Value::as_str).and_then(parse_timestamp),
            server_id,
        })
    }
}

// ============================================================================
// MemberUpdate
// ============================================================================

/// A member's server profile changed.
#[derive(Debug, Clone)]
pub struct MemberUpdate {
    /// Server the member belongs to.
    pub server_id: Option<ServerId>,
    /// The member's user record.
    pub user: UserHandle,
    /// New nickname; `None` when it was cleared.
    pub nickname: Option<String>,
}

impl MemberUpdate {
    /// Decodes the data of a `TeamMemberUpdated` frame.
    ///
    /// # Errors
    ///
    /// [`Error::Decode`] if `userInfo.id` is missing.
    pub fn from_event(data: &Value, cache: &IdentityCache) -> Result<Self> {
        let server_id = event_server_id(data);
        let info = &data["userInfo"];

        let user_id = info
            .get("id")
            .and_then(string_of)
            .map(UserId::new)
            .ok_or_else(|| Error::decode("member update without user id"))?;

        Ok(Self {
            user: cache.observe(&user_id, server_id.as_ref()),
            nickname: info.get("nickname").and_then(string_of),
            server_id,
        })
    }
}

// ============================================================================
// RolesUpdate
// ============================================================================

/// Role assignments of one member after a change.
#[derive(Debug, Clone)]
pub struct MemberRoles {
    /// The member's user record.
    pub user: UserHandle,
    /// Role ids now assigned.
    pub role_ids: Vec<u64>,
}

/// Role assignments changed for one or more members.
#[derive(Debug, Clone)]
pub struct RolesUpdate {
    /// Server the roles belong to.
    pub server_id: Option<ServerId>,
    /// Updated members.
    pub members: Vec<MemberRoles>,
}

impl RolesUpdate {
    /// Decodes the data of a `teamRolesUpdated` frame.
    ///
    /// Entries without a user id are skipped.
    ///
    /// # Errors
    ///
    /// [`Error::Decode`] if `memberRoleIds` is not an array.
    pub fn from_event(data: &Value, cache: &IdentityCache) -> Result<Self> {
        let server_id = event_server_id(data);
        let entries = data["memberRoleIds"]
            .as_array()
            .ok_or_else(|| Error::decode("memberRoleIds is not an array"))?;

        let members = entries
            .iter()
            .filter_map(|entry| {
                let user_id = entry.get("userId").and_then(string_of)?;
                Some(MemberRoles {
                    user: cache.observe(&UserId::new(user_id), server_id.as_ref()),
                    role_ids: role_ids(entry.get("roleIds")),
                })
            })
            .collect();

        Ok(Self { server_id, members })
    }
}

// ============================================================================
// Helpers
// ============================================================================

fn event_server_id(data: &Value) -> Option<ServerId> {
    data.get("serverId").and_then(string_of).map(ServerId::new)
}

fn role_ids(raw: Option<&Value>) -> Vec<u64> {
    raw.and_then(Value::as_array)
        .map(|ids| ids.iter().filter_map(Value::as_u64).collect())
        .unwrap_or_default()
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use serde_json::json;

    #[test]
    fn test_member_joined_merges_user() {
        let cache = IdentityCache::new();
        let data = json!({
            "serverId": "S1",
            "member": {
                "user": { "id": "U1", "type": "user", "name": "alice", "avatar": "https://cdn/a.png" },
                "roleIds": [1, 2],
                "nickname": "ally",
                "joinedAt": "2021-05-01T12:00:00Z",
                "isOwner": false
            }
        });

        let member = Member::from_event(&data, &cache).expect("valid");

        assert_eq!(member.server_id, Some(ServerId::new("S1")));
        assert_eq!(member.role_ids, vec![1, 2]);
        assert_eq!(member.nickname.as_deref(), Some("ally"));
        assert!(member.joined_at.is_some());

        let cached = cache.get(&UserId::new("U1")).expect("cached");
        assert!(cached.ptr_eq(&member.user));
        assert_eq!(cached.read().avatar_url.as_deref(), Some("https://cdn/a.png"));
        assert_eq!(cached.server_id(), Some(ServerId::new("S1")));
    }

    #[test]
    fn test_member_without_user_is_error() {
        let cache = IdentityCache::new();
        let err = Member::from_event(&json!({ "member": { "roleIds": [] } }), &cache).unwrap_err();
        assert!(matches!(err, Error::Decode { .. }));
    }

    #[test]
    fn test_member_removed() {
        let cache = IdentityCache::new();
        let data = json!({ "serverId": "S1", "userId": "U1", "isKick": true });

        let removed = MemberRemoved::from_event(&data, &cache).expect("valid");

        assert!(removed.is_kick);
        assert!(!removed.is_ban);
        assert!(!removed.is_voluntary());
        assert_eq!(removed.user.id(), UserId::new("U1"));
    }

    #[test]
    fn test_member_ban() {
        let cache = IdentityCache::new();
        let data = json!({
            "serverId": "S1",
            "serverMemberBan": {
                "user": { "id": "U1", "type": "user", "name": "mallory" },
                "reason": "spam",
                "createdBy": "U2",
                "createdAt": "2021-05-01T12:00:00Z"
            }
        });

        let ban = MemberBan::from_event(&data, &cache).expect("valid");

        assert_eq!(ban.user.username().as_deref(), Some("mallory"));
        assert_eq!(ban.reason.as_deref(), Some("spam"));
        assert_eq!(ban.banned_by.as_ref().map(UserHandle::id), Some(UserId::new("U2")));
        assert!(ban.banned_at.is_some());
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn test_member_update_keeps_cached_profile() {
        let cache = IdentityCache::new();
        cache.ingest_raw(&json!({ "id": "U1", "name": "alice" }), None);

        let data = json!({ "serverId": "S1", "userInfo": { "id": "U1", "nickname": null } });
        let update = MemberUpdate::from_event(&data, &cache).expect("valid");

        assert!(update.nickname.is_none());
        assert_eq!(update.user.username().as_deref(), Some("alice"));
    }

    #[test]
    fn test_roles_update_skips_entries_without_user() {
        let cache = IdentityCache::new();
        let data = json!({
            "serverId": "S1",
            "memberRoleIds": [
                { "userId": "U1", "roleIds": [3] },
                { "roleIds": [4] },
                { "userId": "U2", "roleIds": [] }
            ]
        });

        let update = RolesUpdate::from_event(&data, &cache).expect("valid");

        assert_eq!(update.members.len(), 2);
        assert_eq!(update.members[0].role_ids, vec![3]);
        assert!(update.members[1].role_ids.is_empty());
    }

    #[test]
    fn test_roles_update_requires_array() {
        let cache = IdentityCache::new();
        assert!(RolesUpdate::from_event(&json!({ "memberRoleIds": {} }), &cache).is_err());
    }
}
