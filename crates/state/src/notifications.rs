//! Notification Dispatcher: the admin and client notification channels.
//!
//! Notifications are created only by the producer of an event (a sent chat
//! message, a placed order, a submitted reset request). Nothing on a read
//! path ever emits, so any number of polling contexts can re-read the
//! channels without duplicating records.

use tracing::{debug, info, instrument, warn};
use wonder_core::{Channel, ConversationId, NotificationId, NotificationKind};

use crate::clock::{Clock, next_timestamp_id};
use crate::error::{Result, StateError};
use crate::models::{Notification, Payload};
use crate::store::{Store, keys};

/// Store key holding a channel's notifications.
#[must_use]
pub const fn channel_key(channel: Channel) -> &'static str {
    match channel {
        Channel::Admin => keys::ADMIN_NOTIFICATIONS,
        Channel::Client => keys::CLIENT_NOTIFICATIONS,
    }
}

/// Reads and writes both notification channels.
pub struct NotificationDispatcher<'a> {
    store: &'a Store,
    clock: &'a dyn Clock,
}

impl<'a> NotificationDispatcher<'a> {
    /// Create a new dispatcher.
    #[must_use]
    pub const fn new(store: &'a Store, clock: &'a dyn Clock) -> Self {
        Self { store, clock }
    }

    /// Append an unread notification to `channel`.
    ///
    /// # Errors
    ///
    /// Returns `StateError::StorageExhausted` if the store is full, or another
    /// error if the channel cannot be read or written.
    #[instrument(skip(self, title, body, payload), fields(channel = %channel, kind = %payload.kind()))]
    pub fn emit(
        &self,
        channel: Channel,
        title: &str,
        body: &str,
        payload: Payload,
    ) -> Result<Notification> {
        let mut notifications = self.load(channel)?;
        let now = self.clock.now();
        let id = next_timestamp_id(
            now.timestamp_millis(),
            notifications.iter().map(|n| n.id.as_i64()),
        );

        let notification = Notification {
            id: NotificationId::new(id),
            channel,
            title: title.to_owned(),
            body: body.to_owned(),
            read: false,
            created_at: now,
            payload,
        };
        notifications.push(notification.clone());
        self.store.save_collection(channel_key(channel), &notifications)?;

        info!(notification_id = %notification.id, "Notification emitted");
        Ok(notification)
    }

    /// Emit, logging and swallowing any failure.
    ///
    /// Used after a primary write has already succeeded; the primary action
    /// must not fail because its notification could not be stored.
    pub fn emit_best_effort(
        &self,
        channel: Channel,
        title: &str,
        body: &str,
        payload: Payload,
    ) -> Option<Notification> {
        let kind = payload.kind();
        match self.emit(channel, title, body, payload) {
            Ok(notification) => Some(notification),
            Err(e) => {
                warn!(%channel, %kind, error = %e, "Failed to store notification, dropping it");
                None
            }
        }
    }

    /// Every notification on `channel`, most recent first.
    ///
    /// # Errors
    ///
    /// Returns an error if the channel cannot be read.
    pub fn list(&self, channel: Channel) -> Result<Vec<Notification>> {
        let mut notifications = self.load(channel)?;
        notifications.sort_by(|a, b| {
            b.created_at
                .cmp(&a.created_at)
                .then_with(|| b.id.cmp(&a.id))
        });
        Ok(notifications)
    }

    /// Unread notifications on `channel`, most recent first.
    ///
    /// # Errors
    ///
    /// Returns an error if the channel cannot be read.
    pub fn list_unread(&self, channel: Channel) -> Result<Vec<Notification>> {
        let mut notifications = self.list(channel)?;
        notifications.retain(|n| !n.read);
        Ok(notifications)
    }

    /// Number of unread notifications on `channel`.
    ///
    /// # Errors
    ///
    /// Returns an error if the channel cannot be read.
    pub fn unread_count(&self, channel: Channel) -> Result<usize> {
        Ok(self.load(channel)?.iter().filter(|n| !n.read).count())
    }

    /// Flip one notification to read.
    ///
    /// # Errors
    ///
    /// Returns `StateError::NotFound` if no notification has this id.
    #[instrument(skip(self))]
    pub fn mark_read(&self, channel: Channel, id: NotificationId) -> Result<()> {
        let mut notifications = self.load(channel)?;
        let notification = notifications
            .iter_mut()
            .find(|n| n.id == id)
            .ok_or_else(|| StateError::not_found("notification", id))?;

        if notification.read {
            debug!("Notification already read");
            return Ok(());
        }
        notification.read = true;
        self.store.save_collection(channel_key(channel), &notifications)?;
        Ok(())
    }

    /// Flip every unread notification on `channel` to read. Returns how many changed.
    ///
    /// # Errors
    ///
    /// Returns an error if the channel cannot be read or written.
    #[instrument(skip(self))]
    pub fn mark_all_read(&self, channel: Channel) -> Result<usize> {
        self.mark_where(channel, |_| true)
    }

    /// Flip every unread chat notification about `conversation` to read.
    /// Returns how many changed.
    ///
    /// # Errors
    ///
    /// Returns an error if the channel cannot be read or written.
    #[instrument(skip(self), fields(conversation = %conversation))]
    pub fn mark_conversation_read(
        &self,
        channel: Channel,
        conversation: &ConversationId,
    ) -> Result<usize> {
        self.mark_where(channel, |n| n.concerns_conversation(conversation))
    }

    /// Chat alerts to show on a customer's screen.
    ///
    /// While the chat is open the customer sees messages directly, so nothing
    /// is returned or consumed. Otherwise every unread chat notification
    /// (limited to `conversation` when given) is returned and marked read.
    ///
    /// # Errors
    ///
    /// Returns an error if the channel cannot be read or written.
    pub fn take_chat_alerts(
        &self,
        channel: Channel,
        conversation: Option<&ConversationId>,
        chat_open: bool,
    ) -> Result<Vec<Notification>> {
        if chat_open {
            return Ok(Vec::new());
        }

        let wanted = |n: &Notification| {
            !n.read
                && n.kind() == NotificationKind::Chat
                && conversation.is_none_or(|c| n.concerns_conversation(c))
        };

        let mut notifications = self.load(channel)?;
        let mut alerts = Vec::new();
        for n in notifications.iter_mut().filter(|n| wanted(n)) {
            n.read = true;
            alerts.push(n.clone());
        }

        if !alerts.is_empty() {
            self.store.save_collection(channel_key(channel), &notifications)?;
            debug!(%channel, count = alerts.len(), "Chat alerts consumed");
        }
        Ok(alerts)
    }

    fn mark_where(&self, channel: Channel, pred: impl Fn(&Notification) -> bool) -> Result<usize> {
        let mut notifications = self.load(channel)?;
        let mut changed = 0;
        for n in notifications.iter_mut().filter(|n| !n.read && pred(n)) {
            n.read = true;
            changed += 1;
        }
        if changed > 0 {
            self.store.save_collection(channel_key(channel), &notifications)?;
        }
        Ok(changed)
    }

    /// Load a channel. The channel is implied by the key, so records
    /// written without one are labelled here.
    fn load(&self, channel: Channel) -> Result<Vec<Notification>> {
        let mut notifications: Vec<Notification> =
            self.store.load_collection(channel_key(channel))?;
        for n in &mut notifications {
            n.channel = channel;
        }
        Ok(notifications)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Arc;

    use chrono::TimeDelta;
    use wonder_core::OrderId;

    use super::*;
    use crate::clock::ManualClock;
    use crate::models::{ChatRef, OrderRef};
    use crate::store::{ContextId, KeyValueStore, MemoryStore};

    fn setup() -> (Arc<MemoryStore>, Store, ManualClock) {
        let backend = Arc::new(MemoryStore::new());
        let shared: Arc<dyn KeyValueStore> = backend.clone();
        let store = Store::new(shared, ContextId::named("tab"));
        (backend, store, ManualClock::at_millis(1_700_000_000_000))
    }

    fn chat(conv: &str) -> Payload {
        Payload::Chat(ChatRef {
            conversation_id: ConversationId::parse(conv).unwrap(),
            message_id: None,
        })
    }

    #[test]
    fn test_emit_assigns_unique_ids_within_one_millisecond() {
        let (_, store, clock) = setup();
        let dispatcher = NotificationDispatcher::new(&store, &clock);

        let a = dispatcher.emit(Channel::Admin, "t", "a", chat("g1")).unwrap();
        let b = dispatcher.emit(Channel::Admin, "t", "b", chat("g1")).unwrap();

        assert_ne!(a.id, b.id);
        assert!(!a.read);
        assert_eq!(dispatcher.unread_count(Channel::Admin).unwrap(), 2);
        assert_eq!(dispatcher.unread_count(Channel::Client).unwrap(), 0);
    }

    #[test]
    fn test_list_unread_newest_first() {
        let (_, store, clock) = setup();
        let dispatcher = NotificationDispatcher::new(&store, &clock);

        let first = dispatcher.emit(Channel::Admin, "t", "first", chat("g1")).unwrap();
        clock.advance(TimeDelta::seconds(5));
        let second = dispatcher
            .emit(Channel::Admin, "t", "second", Payload::Order(OrderRef { order_id: OrderId::new(1) }))
            .unwrap();
        dispatcher.mark_read(Channel::Admin, first.id).unwrap();

        let unread = dispatcher.list_unread(Channel::Admin).unwrap();
        assert_eq!(unread.len(), 1);
        assert_eq!(unread[0].id, second.id);

        let all = dispatcher.list(Channel::Admin).unwrap();
        assert_eq!(all[0].id, second.id);
        assert_eq!(all[1].id, first.id);
    }

    #[test]
    fn test_mark_read_unknown_id() {
        let (_, store, clock) = setup();
        let dispatcher = NotificationDispatcher::new(&store, &clock);
        let err = dispatcher.mark_read(Channel::Admin, NotificationId::new(9)).unwrap_err();
        assert!(matches!(err, StateError::NotFound { entity: "notification", .. }));
    }

    #[test]
    fn test_mark_conversation_read_only_touches_that_conversation() {
        let (_, store, clock) = setup();
        let dispatcher = NotificationDispatcher::new(&store, &clock);
        dispatcher.emit(Channel::Admin, "t", "x", chat("g1")).unwrap();
        dispatcher.emit(Channel::Admin, "t", "y", chat("g2")).unwrap();

        let changed = dispatcher
            .mark_conversation_read(Channel::Admin, &ConversationId::parse("g1").unwrap())
            .unwrap();

        assert_eq!(changed, 1);
        assert_eq!(dispatcher.unread_count(Channel::Admin).unwrap(), 1);
    }

    #[test]
    fn test_take_chat_alerts_consumes_only_when_closed() {
        let (_, store, clock) = setup();
        let dispatcher = NotificationDispatcher::new(&store, &clock);
        dispatcher.emit(Channel::Client, "t", "reply", chat("g1")).unwrap();
        dispatcher.emit(Channel::Client, "t", "other", chat("g2")).unwrap();
        let me = ConversationId::parse("g1").unwrap();

        assert!(dispatcher.take_chat_alerts(Channel::Client, Some(&me), true).unwrap().is_empty());
        assert_eq!(dispatcher.unread_count(Channel::Client).unwrap(), 2);

        let alerts = dispatcher.take_chat_alerts(Channel::Client, Some(&me), false).unwrap();
        assert_eq!(alerts.len(), 1);
        assert!(dispatcher.take_chat_alerts(Channel::Client, Some(&me), false).unwrap().is_empty());
        assert_eq!(dispatcher.unread_count(Channel::Client).unwrap(), 1);
    }

    #[test]
    fn test_best_effort_swallows_quota_failure() {
        let (backend, store, clock) = setup();
        backend.limit_key(keys::ADMIN_NOTIFICATIONS, 0);
        let dispatcher = NotificationDispatcher::new(&store, &clock);

        assert!(dispatcher.emit_best_effort(Channel::Admin, "t", "b", chat("g1")).is_none());
        assert!(matches!(
            dispatcher.emit(Channel::Admin, "t", "b", chat("g1")),
            Err(StateError::StorageExhausted { .. })
        ));
    }

    #[test]
    fn test_legacy_records_get_channel_from_key() {
        let (backend, store, clock) = setup();
        backend
            .set(
                keys::CLIENT_NOTIFICATIONS,
                serde_json::json!([{
                    "id": 1, "type": "chat", "title": "t", "message": "m",
                    "data": { "userIdentifier": "g1" }, "read": false,
                    "createdAt": "2024-01-01T00:00:00Z"
                }]),
                &ContextId::named("legacy"),
            )
            .unwrap();
        let dispatcher = NotificationDispatcher::new(&store, &clock);
        let list = dispatcher.list(Channel::Client).unwrap();
        assert_eq!(list[0].channel, Channel::Client);
    }
}
