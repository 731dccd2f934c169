//! Type-safe identifiers for platform entities.
//!
//! Newtype wrappers prevent mixing incompatible IDs at compile time.
//! The platform uses opaque strings for users, servers, channels and
//! messages, and integers for emotes.
//!
//! | Type | Backing | Example |
//! |------|---------|---------|
//! | [`UserId`] | `String` | `"y7Fqn"` |
//! | [`ServerId`] | `String` | `"K8zv6"` |
//! | [`ChannelId`] | `String` | UUID string |
//! | [`MessageId`] | `String` | UUID string |
//! | [`WebhookId`] | `String` | UUID string |
//! | [`EmoteId`] | `u64` | `90001164` |
//! | [`SubscriptionId`] | `u64` | process-local counter |

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};

// ============================================================================
// String Identifiers
// ============================================================================

macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Creates an identifier from any string-like value.
            #[inline]
            #[must_use]
            pub fn new(value: impl Into<String>) -> Self {
                Self(value.into())
            }

            /// Returns the identifier as a string slice.
            #[inline]
            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            #[inline]
            fn from(value: &str) -> Self {
                Self(value.to_string())
            }
        }

        impl From<String> for $name {
            #[inline]
            fn from(value: String) -> Self {
                Self(value)
            }
        }

        impl AsRef<str> for $name {
            #[inline]
            fn as_ref(&self) -> &str {
                &self.0
            }
        }
    };
}

string_id!(
    /// Identifier of a user (human or bot).
    UserId
);

string_id!(
    /// Identifier of a server (team).
    ServerId
);

string_id!(
    /// Identifier of a channel.
    ChannelId
);

string_id!(
    /// Identifier of a chat message.
    MessageId
);

string_id!(
    /// Identifier of a webhook.
    WebhookId
);

// ============================================================================
// EmoteId
// ============================================================================

/// Identifier of an emote used for reactions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EmoteId(u64);

impl EmoteId {
    /// Creates an emote identifier.
    #[inline]
    #[must_use]
    pub const fn new(value: u64) -> Self {
        Self(value)
    }

    /// Returns the raw numeric value.
    #[inline]
    #[must_use]
    pub const fn as_u64(self) -> u64 {
        self.0
    }
}

impl fmt::Display for EmoteId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for EmoteId {
    #[inline]
    fn from(value: u64) -> Self {
        Self(value)
    }
}

// ============================================================================
// SubscriptionId
// ============================================================================

/// Global counter for subscription IDs.
static NEXT_SUBSCRIPTION_ID: AtomicU64 = AtomicU64::new(1);

/// Token returned by a subscription, used to unsubscribe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriptionId(u64);

impl SubscriptionId {
    /// Allocates the next process-unique subscription ID.
    #[inline]
    #[must_use]
    pub fn next() -> Self {
        Self(NEXT_SUBSCRIPTION_ID.fetch_add(1, Ordering::Relaxed))
    }

    /// Returns the raw numeric value.
    #[inline]
    #[must_use]
    pub const fn as_u64(self) -> u64 {
        self.0
    }
}

impl fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "sub-{}", self.0)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_string_id_roundtrip_display() {
        let id = UserId::new("y7Fqn");
        assert_eq!(id.as_str(), "y7Fqn");
        assert_eq!(id.to_string(), "y7Fqn");
        assert_eq!(UserId::from("y7Fqn"), id);
    }

    #[test]
    fn test_string_id_serde_is_transparent() {
        let id: ServerId = serde_json::from_str("\"K8zv6\"").expect("deserialize");
        assert_eq!(id.as_str(), "K8zv6");
        assert_eq!(serde_json::to_string(&id).expect("serialize"), "\"K8zv6\"");
    }

    #[test]
    fn test_subscription_ids_are_unique() {
        let a = SubscriptionId::next();
        let b = SubscriptionId::next();
        assert_ne!(a, b);
        assert!(b.as_u64() > a.as_u64());
    }

    #[test]
    fn test_emote_id_display() {
        assert_eq!(EmoteId::new(90001164).to_string(), "90001164");
    }
}
