//! Storage exhaustion, identity persistence and legacy records.

#![allow(clippy::unwrap_used, clippy::indexing_slicing)]

use serde_json::json;
use wonder_core::{Channel, Email, NotificationKind, Sender, UserId};
use wonder_integration_tests::{Harness, checkout, conv};
use wonder_state::models::{MessageDraft, SignedInUser};
use wonder_state::store::keys;
use wonder_state::{MemoryStore, StateError};

// =============================================================================
// Storage Exhaustion
// =============================================================================

#[test]
fn test_message_survives_full_notification_queue() {
    let store = MemoryStore::new();
    store.limit_key(keys::ADMIN_NOTIFICATIONS, 0);
    let h = Harness::with_store(store);
    let ctx = h.context("client");

    let message = ctx
        .conversations()
        .send_message(MessageDraft::from_client(conv("g1"), "Guest", "hello"))
        .unwrap();

    assert_eq!(ctx.conversations().load_thread(&conv("g1")).unwrap(), [message]);
    assert!(ctx.notifications().list(Channel::Admin).unwrap().is_empty());
}

#[test]
fn test_order_survives_full_notification_queue() {
    let store = MemoryStore::new();
    store.limit_key(keys::ADMIN_NOTIFICATIONS, 0);
    let h = Harness::with_store(store);
    let ctx = h.context("shopper");

    let order = ctx.orders().place_order(checkout("Jane", 1000, 1)).unwrap();
    assert_eq!(ctx.orders().get(order.id).unwrap(), order);
}

#[test]
fn test_full_chat_log_fails_the_send() {
    let store = MemoryStore::new();
    store.limit_key(keys::CHAT_MESSAGES, 0);
    let h = Harness::with_store(store);
    let ctx = h.context("client");

    let err = ctx
        .conversations()
        .send_message(MessageDraft::from_client(conv("g1"), "Guest", "hello"))
        .unwrap_err();
    assert!(matches!(err, StateError::StorageExhausted { .. }));
    // Nothing was announced for a message that does not exist.
    assert!(ctx.notifications().list(Channel::Admin).unwrap().is_empty());
}

// =============================================================================
// Identity
// =============================================================================

#[test]
fn test_guest_id_is_shared_by_every_context() {
    let h = Harness::new();
    let first = h.context("tab-1").identity().resolve().unwrap();
    let second = h.context("tab-2").identity().resolve().unwrap();
    assert!(first.is_guest());
    assert_eq!(first, second);
}

#[test]
fn test_signed_in_customer_chats_under_email() {
    let h = Harness::new();
    let ctx = h.context("tab");
    let identity = ctx.identity();
    let guest = identity.resolve().unwrap();

    ctx.conversations()
        .send_message(MessageDraft::from_client(guest.clone(), "Guest", "before sign-in"))
        .unwrap();

    identity
        .sign_in(&SignedInUser {
            id: UserId::new(7),
            name: "Jane".to_owned(),
            email: Email::parse("jane@example.com").unwrap(),
        })
        .unwrap();
    let signed_in = identity.resolve().unwrap();
    assert_eq!(signed_in.as_str(), "jane@example.com");
    assert_eq!(identity.display_name().unwrap(), "Jane");

    // The guest thread moves over while the new identity has no messages.
    assert_eq!(identity.adopt_legacy_guest(&guest).unwrap(), 1);
    assert_eq!(identity.adopt_legacy_guest(&guest).unwrap(), 0);

    identity.sign_out().unwrap();
    assert_eq!(identity.resolve().unwrap(), guest);
}

// =============================================================================
// Legacy Records
// =============================================================================

#[test]
fn test_legacy_field_names_are_read() {
    let h = Harness::new();
    let ctx = h.context("admin");
    ctx.store()
        .save_value(
            keys::CHAT_MESSAGES,
            &json!([{
                "id": 1_700_000_000_000_i64,
                "sender": "client",
                "text": "old message",
                "userIdentifier": "guest_1699999999999_abc123xyz",
                "userName": "",
                "timestamp": "2023-11-14T22:13:20Z",
                "read": false
            }]),
        )
        .unwrap();
    ctx.store()
        .save_value(
            keys::ADMIN_NOTIFICATIONS,
            &json!([{
                "id": 1_700_000_000_001_i64,
                "type": "chat",
                "title": "New Chat Message",
                "message": "New message from Guest: old message",
                "read": false,
                "createdAt": "2023-11-14T22:13:20Z",
                "data": { "userIdentifier": "guest_1699999999999_abc123xyz" }
            }]),
        )
        .unwrap();

    let conversations = ctx.conversations().list_conversations(Sender::Admin).unwrap();
    assert_eq!(conversations.len(), 1);
    assert_eq!(conversations[0].display_name, "Guest");
    assert_eq!(conversations[0].unread_count, 1);

    let notifications = ctx.notifications().list(Channel::Admin).unwrap();
    assert_eq!(notifications.len(), 1);
    assert_eq!(notifications[0].kind(), NotificationKind::Chat);
    assert_eq!(notifications[0].channel, Channel::Admin);
    assert!(notifications[0].concerns_conversation(&conv("guest_1699999999999_abc123xyz")));
}
