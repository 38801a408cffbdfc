//! Chat messages and the conversation summaries derived from them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use wonder_core::{ConversationId, MessageId, Sender};

use super::{GUEST_NAME, preview};

/// One chat message in the flat `chatMessages` log.
///
/// Immutable once written except for `read`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub id: MessageId,
    pub sender: Sender,
    pub text: String,
    #[serde(alias = "userIdentifier")]
    pub conversation_id: ConversationId,
    #[serde(alias = "userName", default = "guest_name", deserialize_with = "name_or_guest")]
    pub display_name: String,
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub read: bool,
}

impl Message {
    /// Whether `viewer` still has to read this message.
    #[must_use]
    pub fn is_unread_for(&self, viewer: Sender) -> bool {
        self.sender == viewer.opposite() && !self.read
    }
}

fn guest_name() -> String {
    GUEST_NAME.to_owned()
}

fn name_or_guest<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    let name = Option::<String>::deserialize(deserializer)?;
    Ok(name
        .filter(|n| !n.trim().is_empty())
        .unwrap_or_else(guest_name))
}

/// A message about to be sent. Id, timestamp and read flag are assigned on send.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageDraft {
    pub sender: Sender,
    pub conversation_id: ConversationId,
    pub text: String,
    /// `None` lets the sender path pick the name (the customer's, or the
    /// conversation's existing name for admin replies).
    pub display_name: Option<String>,
}

impl MessageDraft {
    /// A customer writing into their own conversation.
    #[must_use]
    pub fn from_client(
        conversation_id: ConversationId,
        display_name: impl Into<String>,
        text: impl Into<String>,
    ) -> Self {
        Self {
            sender: Sender::Client,
            conversation_id,
            text: text.into(),
            display_name: Some(display_name.into()),
        }
    }

    /// Staff replying into a customer's conversation.
    #[must_use]
    pub fn from_admin(conversation_id: ConversationId, text: impl Into<String>) -> Self {
        Self {
            sender: Sender::Admin,
            conversation_id,
            text: text.into(),
            display_name: None,
        }
    }
}

/// Per-customer summary derived from the message log. Never persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Conversation {
    pub conversation_id: ConversationId,
    pub display_name: String,
    pub last_message: Message,
    pub unread_count: usize,
}

impl Conversation {
    /// Time of the most recent message.
    #[must_use]
    pub const fn last_activity(&self) -> DateTime<Utc> {
        self.last_message.timestamp
    }

    /// Last message text cut to `max` characters for list display.
    #[must_use]
    pub fn preview(&self, max: usize) -> String {
        preview(&self.last_message.text, max)
    }
}
