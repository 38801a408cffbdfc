//! Notification records for the admin and client channels.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize, Serializer};
use serde_json::Value;
use wonder_core::{
    Channel, ConversationId, MessageId, NotificationId, NotificationKind, OrderId, ResetRequestId,
    UserId,
};

/// One notification. Only `read` changes after creation.
///
/// Stored as `{id, channel, kind, title, body, read, createdAt, payload}`
/// where `payload` is a plain object whose shape depends on `kind`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(try_from = "RawNotification")]
pub struct Notification {
    pub id: NotificationId,
    pub channel: Channel,
    pub title: String,
    pub body: String,
    pub read: bool,
    pub created_at: DateTime<Utc>,
    pub payload: Payload,
}

impl Notification {
    /// What triggered this notification.
    #[must_use]
    pub const fn kind(&self) -> NotificationKind {
        self.payload.kind()
    }

    /// Whether this is a chat notification about `conversation`.
    #[must_use]
    pub fn concerns_conversation(&self, conversation: &ConversationId) -> bool {
        matches!(&self.payload, Payload::Chat(chat) if &chat.conversation_id == conversation)
    }
}

/// Back-reference needed to act on a notification, keyed by kind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum Payload {
    Chat(ChatRef),
    Order(OrderRef),
    PasswordReset(ResetRef),
}

impl Payload {
    /// The kind this payload belongs to.
    #[must_use]
    pub const fn kind(&self) -> NotificationKind {
        match self {
            Self::Chat(_) => NotificationKind::Chat,
            Self::Order(_) => NotificationKind::Order,
            Self::PasswordReset(_) => NotificationKind::PasswordReset,
        }
    }

    fn from_value(kind: NotificationKind, value: Value) -> Result<Self, serde_json::Error> {
        Ok(match kind {
            NotificationKind::Chat => Self::Chat(serde_json::from_value(value)?),
            NotificationKind::Order => Self::Order(serde_json::from_value(value)?),
            NotificationKind::PasswordReset => Self::PasswordReset(serde_json::from_value(value)?),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatRef {
    #[serde(alias = "userIdentifier")]
    pub conversation_id: ConversationId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message_id: Option<MessageId>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderRef {
    pub order_id: OrderId,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResetRef {
    pub user_id: UserId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_id: Option<ResetRequestId>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawNotification {
    id: NotificationId,
    #[serde(default)]
    channel: Channel,
    #[serde(alias = "type")]
    kind: NotificationKind,
    #[serde(default)]
    title: String,
    #[serde(alias = "message", default)]
    body: String,
    #[serde(default)]
    read: bool,
    created_at: DateTime<Utc>,
    #[serde(alias = "data", default)]
    payload: Value,
}

impl TryFrom<RawNotification> for Notification {
    type Error = serde_json::Error;

    fn try_from(raw: RawNotification) -> Result<Self, Self::Error> {
        Ok(Self {
            id: raw.id,
            channel: raw.channel,
            title: raw.title,
            body: raw.body,
            read: raw.read,
            created_at: raw.created_at,
            payload: Payload::from_value(raw.kind, raw.payload)?,
        })
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct NotificationRecord<'a> {
    id: NotificationId,
    channel: Channel,
    kind: NotificationKind,
    title: &'a str,
    body: &'a str,
    read: bool,
    created_at: DateTime<Utc>,
    payload: &'a Payload,
}

impl Serialize for Notification {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        NotificationRecord {
            id: self.id,
            channel: self.channel,
            kind: self.kind(),
            title: &self.title,
            body: &self.body,
            read: self.read,
            created_at: self.created_at,
            payload: &self.payload,
        }
        .serialize(serializer)
    }
}
