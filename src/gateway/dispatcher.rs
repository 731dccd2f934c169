//! Event dispatch.
//!
//! Turns decoded domain frames into [`Event`]s and delivers them, along with
//! session lifecycle events, to subscribers.
//!
//! # Routing Table
//!
//! | Wire type | Event | Required fields |
//! |-----------|-------|-----------------|
//! | `ChatMessageCreated` | `MessageCreated` | `message` |
//! | `ChatMessageUpdated` | `MessageUpdated` | `message` |
//! | `ChatMessageDeleted` | `MessageDeleted` | `message` |
//! | `TeamMemberJoined` | `MemberJoined` | `member` |
//! | `TeamMemberRemoved` | `MemberLeft` | `serverId`, `userId` |
//! | `TeamMemberBanned` | `MemberBanned` | `serverMemberBan` |
//! | `TeamMemberUnbanned` | `MemberUnbanned` | `serverMemberBan` |
//! | `TeamMemberUpdated` | `MemberUpdated` | `userInfo` |
//! | `teamRolesUpdated` | `MemberRolesUpdated` | `memberRoleIds` |
//! | `TeamWebhookCreated` | `WebhookCreated` | `webhook` |
//! | `TeamWebhookUpdated` | `WebhookUpdated` | `webhook` |
//! | `ChannelMessageReactionCreated` | `ReactionAdded` | `reaction` |
//! | `ChannelMessageReactionDeleted` | `ReactionRemoved` | `reaction` |
//!
//! Message events authored by the session's own user are suppressed.
//!
//! # Handlers
//!
//! Handlers run synchronously on the session task, in registration order.
//! They must not block; spawn a task for slow work.

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::sync::Arc;

use parking_lot::RwLock;
use serde_json::Value;
use tokio::sync::mpsc;
use tracing::{debug, trace, warn};

use crate::cache::IdentityCache;
use crate::client::SessionRef;
use crate::error::{Error, Result};
use crate::identifiers::{SubscriptionId, UserId};
use crate::model::{
    Member, MemberBan, MemberRemoved, MemberUpdate, Message, Reaction, RolesUpdate, Webhook,
};
use crate::protocol::{DomainFrame, EventType};

use super::events::{Dispatch, Event, EventKind};

// ============================================================================
// Types
// ============================================================================

/// Subscriber callback.
pub type EventHandler = Arc<dyn Fn(&Dispatch) + Send + Sync>;

/// One row of the routing table.
#[derive(Debug, Clone, Copy)]
struct Route {
    event_type: EventType,
    kind: EventKind,
    required: &'static [&'static str],
}

const ROUTES: [Route; EventType::ALL.len()] = [
    Route { event_type: EventType::ChatMessageCreated, kind: EventKind::MessageCreated, required: &["message"] },
    Route { event_type: EventType::ChatMessageUpdated, kind: EventKind::MessageUpdated, required: &["message"] },
    Route { event_type: EventType::ChatMessageDeleted, kind: EventKind::MessageDeleted, required: &["message"] },
    Route { event_type: EventType::TeamMemberJoined, kind: EventKind::MemberJoined, required: &["member"] },
    Route { event_type: EventType::TeamMemberRemoved, kind: EventKind::MemberLeft, required: &["serverId", "userId"] },
    Route { event_type: EventType::TeamMemberBanned, kind: EventKind::MemberBanned, required: &["serverMemberBan"] },
    Route { event_type: EventType::TeamMemberUnbanned, kind: EventKind::MemberUnbanned, required: &["serverMemberBan"] },
    Route { event_type: EventType::TeamMemberUpdated, kind: EventKind::MemberUpdated, required: &["userInfo"] },
    Route { event_type: EventType::TeamRolesUpdated, kind: EventKind::MemberRolesUpdated, required: &["memberRoleIds"] },
    Route { event_type: EventType::TeamWebhookCreated, kind: EventKind::WebhookCreated, required: &["webhook"] },
    Route { event_type: EventType::TeamWebhookUpdated, kind: EventKind::WebhookUpdated, required: &["webhook"] },
    Route { event_type: EventType::ChannelMessageReactionCreated, kind: EventKind::ReactionAdded, required: &["reaction"] },
    Route { event_type: EventType::ChannelMessageReactionDeleted, kind: EventKind::ReactionRemoved, required: &["reaction"] },
];

/// Rows are in `EventType` declaration order.
const fn route(event_type: EventType) -> Route {
    ROUTES[event_type as usize]
}

struct Subscriber {
    id: SubscriptionId,
    kind: Option<EventKind>,
    handler: EventHandler,
}

// ============================================================================
// EventDispatcher
// ============================================================================

/// Typed publish/subscribe hub for one client.
///
/// Cheap to clone; clones share subscribers.
#[derive(Clone)]
pub struct EventDispatcher {
    inner: Arc<DispatcherInner>,
}

struct DispatcherInner {
    cache: IdentityCache,
    session: SessionRef,
    subscribers: RwLock<Vec<Subscriber>>,
}

impl EventDispatcher {
    /// Creates a dispatcher resolving authors through `cache`.
    #[must_use]
    pub fn new(cache: IdentityCache, session: SessionRef) -> Self {
        Self {
            inner: Arc::new(DispatcherInner {
                cache,
                session,
                subscribers: RwLock::new(Vec::new()),
            }),
        }
    }

    /// Returns the identity cache.
    #[inline]
    #[must_use]
    pub fn cache(&self) -> &IdentityCache {
        &self.inner.cache
    }

    // ========================================================================
    // Subscriptions
    // ========================================================================

    /// Registers `handler` for events of `kind`.
    pub fn subscribe<F>(&self, kind: EventKind, handler: F) -> SubscriptionId
    where
        F: Fn(&Dispatch) + Send + Sync + 'static,
    {
        self.insert(Some(kind), Arc::new(handler))
    }

    /// Registers `handler` for every event.
    pub fn subscribe_all<F>(&self, handler: F) -> SubscriptionId
    where
        F: Fn(&Dispatch) + Send + Sync + 'static,
    {
        self.insert(None, Arc::new(handler))
    }

    /// Returns a channel receiving events of `kind` (all events for `None`).
    ///
    /// Events published after the receiver is dropped are discarded; pass
    /// the returned id to [`unsubscribe`](Self::unsubscribe) to stop them.
    pub fn stream(&self, kind: Option<EventKind>) -> (SubscriptionId, mpsc::UnboundedReceiver<Dispatch>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let handler: EventHandler = Arc::new(move |dispatch: &Dispatch| {
            let _ = tx.send(dispatch.clone());
        });
        (self.insert(kind, handler), rx)
    }

    /// Removes a subscription. Returns `false` if it was unknown.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut subscribers = self.inner.subscribers.write();
        let before = subscribers.len();
        subscribers.retain(|subscriber| subscriber.id != id);
        before != subscribers.len()
    }

    /// Returns the number of registered subscriptions.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.inner.subscribers.read().len()
    }

    fn insert(&self, kind: Option<EventKind>, handler: EventHandler) -> SubscriptionId {
        let id = SubscriptionId::next();
        self.inner.subscribers.write().push(Subscriber { id, kind, handler });
        debug!(subscription = %id, kind = kind.map_or("all", EventKind::as_str), "Subscribed");
        id
    }

    // ========================================================================
    // Dispatch
    // ========================================================================

    /// Builds and publishes the event for a domain frame.
    ///
    /// Returns the published kind, or `None` when the frame was suppressed
    /// (own message) or malformed. Malformed frames are logged and dropped.
    pub fn dispatch(&self, frame: DomainFrame, self_user_id: Option<&UserId>) -> Option<EventKind> {
        let event_type = frame.event_type;
        match self.build(&frame, self_user_id) {
            Ok(Some(event)) => {
                let kind = event.kind();
                self.publish(event);
                Some(kind)
            }
            Ok(None) => {
                trace!(%event_type, "Suppressed own message");
                None
            }
            Err(e) => {
                warn!(%event_type, error = %e, "Dropped malformed event");
                None
            }
        }
    }

    /// Delivers `event` to every matching subscriber.
    ///
    /// Returns the number of handlers invoked.
    pub fn publish(&self, event: Event) -> usize {
        let kind = event.kind();
        let handlers: Vec<EventHandler> = self
            .inner
            .subscribers
            .read()
            .iter()
            .filter(|subscriber| subscriber.kind.is_none_or(|wanted| wanted == kind))
            .map(|subscriber| Arc::clone(&subscriber.handler))
            .collect();

        let dispatch = Dispatch {
            event,
            session: self.inner.session.clone(),
        };

        // The lock is released, so handlers may subscribe or unsubscribe.
        for handler in &handlers {
            handler(&dispatch);
        }

        trace!(%kind, handlers = handlers.len(), "Published event");
        handlers.len()
    }

    /// Decodes a frame into an event; `Ok(None)` means suppressed.
    fn build(&self, frame: &DomainFrame, self_user_id: Option<&UserId>) -> Result<Option<Event>> {
        let route = route(frame.event_type);
        let data = &frame.data;

        if let Some(missing) = route.required.iter().find(|field| !has_field(data, field)) {
            return Err(Error::decode(format!("{} without `{missing}`", frame.event_type)));
        }

        let cache = &self.inner.cache;
        let event = match frame.event_type {
            EventType::ChatMessageCreated
            | EventType::ChatMessageUpdated
            | EventType::ChatMessageDeleted => {
                let raw = &data["message"];
                if is_authored_by(raw, self_user_id) {
                    return Ok(None);
                }
                let message = Message::from_payload(raw, cache)?;
                match frame.event_type {
                    EventType::ChatMessageCreated => Event::MessageCreated(message),
                    EventType::ChatMessageUpdated => Event::MessageUpdated(message),
                    _ => Event::MessageDeleted(message),
                }
            }
            EventType::TeamMemberJoined => Event::MemberJoined(Member::from_event(data, cache)?),
            EventType::TeamMemberRemoved => Event::MemberLeft(MemberRemoved::from_event(data, cache)?),
            EventType::TeamMemberBanned => Event::MemberBanned(MemberBan::from_event(data, cache)?),
            EventType::TeamMemberUnbanned => Event::MemberUnbanned(MemberBan::from_event(data, cache)?),
            EventType::TeamMemberUpdated => Event::MemberUpdated(MemberUpdate::from_event(data, cache)?),
            EventType::TeamRolesUpdated => Event::MemberRolesUpdated(RolesUpdate::from_event(data, cache)?),
            EventType::TeamWebhookCreated => Event::WebhookCreated(Webhook::from_event(data, cache)?),
            EventType::TeamWebhookUpdated => Event::WebhookUpdated(Webhook::from_event(data, cache)?),
            EventType::ChannelMessageReactionCreated => Event::ReactionAdded(Reaction::from_event(data, cache)?),
            EventType::ChannelMessageReactionDeleted => Event::ReactionRemoved(Reaction::from_event(data, cache)?),
        };

        debug_assert_eq!(route.event_type, frame.event_type);
        debug_assert_eq!(event.kind(), route.kind);
        Ok(Some(event))
    }
}

impl fmt::Debug for EventDispatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventDispatcher")
            .field("subscribers", &self.subscriber_count())
            .field("cache", &self.inner.cache)
            .finish_non_exhaustive()
    }
}

// ============================================================================
// Helpers
// ============================================================================

fn has_field(data: &Value, field: &str) -> bool {
    data.get(field).is_some_and(|value| !value.is_null())
}

fn is_authored_by(message: &Value, self_user_id: Option<&UserId>) -> bool {
    match (message.get("createdBy").and_then(Value::as_str), self_user_id) {
        (Some(author), Some(own)) => author == own.as_str(),
        _ => false,
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use std::sync::atomic::{AtomicUsize, Ordering};

    use serde_json::json;

    fn dispatcher() -> EventDispatcher {
        EventDispatcher::new(IdentityCache::new(), SessionRef::detached())
    }

    fn frame(event_type: EventType, data: Value) -> DomainFrame {
        DomainFrame { event_type, data }
    }

    fn message_frame(event_type: EventType, author: &str) -> DomainFrame {
        frame(
            event_type,
            json!({
                "serverId": "S1",
                "message": {
                    "id": "M1",
                    "content": "hi",
                    "createdBy": author,
                    "channelId": "C1",
                    "serverId": "S1",
                    "createdAt": "2020-01-01T00:00:00Z"
                }
            }),
        )
    }

    fn counter(dispatcher: &EventDispatcher, kind: Option<EventKind>) -> Arc<AtomicUsize> {
        let count = Arc::new(AtomicUsize::new(0));
        let seen = Arc::clone(&count);
        let handler = move |_: &Dispatch| {
            seen.fetch_add(1, Ordering::SeqCst);
        };
        match kind {
            Some(kind) => dispatcher.subscribe(kind, handler),
            None => dispatcher.subscribe_all(handler),
        };
        count
    }

    #[test]
    fn test_routing_table_covers_every_wire_type() {
        for event_type in EventType::ALL {
            let route = route(event_type);
            assert_eq!(route.event_type, event_type);
            assert!(route.kind.is_domain(), "{event_type} routes to a lifecycle kind");
            assert!(!route.required.is_empty());
        }
    }

    #[test]
    fn test_own_messages_are_suppressed() {
        let dispatcher = dispatcher();
        let count = counter(&dispatcher, None);
        let own = UserId::new("B1");

        for event_type in [
            EventType::ChatMessageCreated,
            EventType::ChatMessageUpdated,
            EventType::ChatMessageDeleted,
        ] {
            assert_eq!(dispatcher.dispatch(message_frame(event_type, "B1"), Some(&own)), None);
        }
        assert_eq!(count.load(Ordering::SeqCst), 0);

        let kind = dispatcher.dispatch(message_frame(EventType::ChatMessageCreated, "U1"), Some(&own));
        assert_eq!(kind, Some(EventKind::MessageCreated));
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_message_author_comes_from_cache() {
        let dispatcher = dispatcher();
        let (_, mut rx) = dispatcher.stream(Some(EventKind::MessageCreated));

        dispatcher.dispatch(message_frame(EventType::ChatMessageCreated, "U1"), None);

        let dispatch = rx.try_recv().expect("one event");
        let message = dispatch.event.message().expect("message event");
        let author = message.author.as_ref().expect("author");
        let cached = dispatcher.cache().get(&UserId::new("U1")).expect("cached");

        assert_eq!(message.content, "hi");
        assert!(author.ptr_eq(&cached));
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_kind_filter() {
        let dispatcher = dispatcher();
        let messages = counter(&dispatcher, Some(EventKind::MessageCreated));
        let reactions = counter(&dispatcher, Some(EventKind::ReactionAdded));

        dispatcher.dispatch(message_frame(EventType::ChatMessageCreated, "U1"), None);

        assert_eq!(messages.load(Ordering::SeqCst), 1);
        assert_eq!(reactions.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_reaction_created_publishes_only_added() {
        let dispatcher = dispatcher();
        let added = counter(&dispatcher, Some(EventKind::ReactionAdded));
        let removed = counter(&dispatcher, Some(EventKind::ReactionRemoved));

        let data = json!({
            "serverId": "S1",
            "reaction": {
                "channelId": "C1",
                "messageId": "M1",
                "createdBy": "U1",
                "emote": { "id": 90001164, "name": "thumbsup", "url": "/e.webp" }
            }
        });
        dispatcher.dispatch(frame(EventType::ChannelMessageReactionCreated, data), None);

        assert_eq!(added.load(Ordering::SeqCst), 1);
        assert_eq!(removed.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_missing_required_field_is_dropped() {
        let dispatcher = dispatcher();
        let count = counter(&dispatcher, None);

        let kind = dispatcher.dispatch(frame(EventType::TeamMemberRemoved, json!({ "serverId": "S1" })), None);

        assert_eq!(kind, None);
        assert_eq!(count.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_unsubscribe() {
        let dispatcher = dispatcher();
        let id = dispatcher.subscribe_all(|_| {});
        assert_eq!(dispatcher.subscriber_count(), 1);

        assert!(dispatcher.unsubscribe(id));
        assert!(!dispatcher.unsubscribe(id));
        assert_eq!(dispatcher.publish(Event::Closed), 0);
    }

    #[test]
    fn test_handler_may_subscribe_during_publish() {
        let dispatcher = dispatcher();
        let inner = dispatcher.clone();
        dispatcher.subscribe(EventKind::Closed, move |_| {
            inner.subscribe_all(|_| {});
        });

        assert_eq!(dispatcher.publish(Event::Closed), 1);
        assert_eq!(dispatcher.subscriber_count(), 2);
    }

    #[test]
    fn test_dispatch_session_is_detached_without_client() {
        let dispatcher = dispatcher();
        let (_, mut rx) = dispatcher.stream(None);
        dispatcher.publish(Event::Closed);

        let dispatch = rx.try_recv().expect("event");
        assert!(matches!(dispatch.session.client(), Err(Error::SessionClosed)));
    }
}
