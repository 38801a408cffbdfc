//! Conversation Aggregator: threads the flat `chatMessages` log into
//! per-customer conversations, and the producer path for new messages.

use std::collections::HashMap;

use tracing::{debug, info, instrument};
use wonder_core::{Channel, ConversationId, MessageId, Sender};

use crate::clock::{Clock, next_timestamp_id};
use crate::error::{Result, StateError};
use crate::models::{ChatRef, Conversation, GUEST_NAME, Message, MessageDraft, Payload, preview};
use crate::notifications::NotificationDispatcher;
use crate::store::{Store, keys};

/// Fold a message log into conversation summaries as seen by `viewer`,
/// most recent activity first.
///
/// The last message of a conversation is the one with the greatest
/// timestamp, whatever its position in the log.
#[must_use]
pub fn aggregate(messages: &[Message], viewer: Sender) -> Vec<Conversation> {
    let mut groups: HashMap<&ConversationId, Vec<&Message>> = HashMap::new();
    for message in messages {
        groups.entry(&message.conversation_id).or_default().push(message);
    }

    let mut conversations: Vec<Conversation> = groups
        .into_iter()
        .filter_map(|(id, thread)| {
            let first = thread.iter().min_by_key(|m| (m.timestamp, m.id))?;
            let last = thread.iter().max_by_key(|m| (m.timestamp, m.id))?;
            Some(Conversation {
                conversation_id: id.clone(),
                display_name: first.display_name.clone(),
                last_message: (*last).clone(),
                unread_count: thread.iter().filter(|m| m.is_unread_for(viewer)).count(),
            })
        })
        .collect();

    conversations.sort_by(|a, b| {
        b.last_activity()
            .cmp(&a.last_activity())
            .then_with(|| a.conversation_id.cmp(&b.conversation_id))
    });
    conversations
}

/// Reads and writes the chat log.
pub struct ConversationAggregator<'a> {
    store: &'a Store,
    clock: &'a dyn Clock,
    preview_chars: usize,
}

impl<'a> ConversationAggregator<'a> {
    /// Create a new aggregator. `preview_chars` bounds the message text
    /// quoted in notification bodies.
    #[must_use]
    pub const fn new(store: &'a Store, clock: &'a dyn Clock, preview_chars: usize) -> Self {
        Self {
            store,
            clock,
            preview_chars,
        }
    }

    /// Every conversation, most recent activity first.
    ///
    /// # Errors
    ///
    /// Returns an error if the log cannot be read.
    pub fn list_conversations(&self, viewer: Sender) -> Result<Vec<Conversation>> {
        Ok(aggregate(&self.load()?, viewer))
    }

    /// One conversation's messages in ascending time order. Unknown
    /// conversations have an empty thread.
    ///
    /// # Errors
    ///
    /// Returns an error if the log cannot be read.
    pub fn load_thread(&self, conversation: &ConversationId) -> Result<Vec<Message>> {
        let mut thread: Vec<Message> = self
            .load()?
            .into_iter()
            .filter(|m| &m.conversation_id == conversation)
            .collect();
        thread.sort_by_key(|m| (m.timestamp, m.id));
        Ok(thread)
    }

    /// Messages in `conversation` that `viewer` has not read yet.
    ///
    /// # Errors
    ///
    /// Returns an error if the log cannot be read.
    pub fn unread_in(&self, conversation: &ConversationId, viewer: Sender) -> Result<usize> {
        Ok(self
            .load()?
            .iter()
            .filter(|m| &m.conversation_id == conversation && m.is_unread_for(viewer))
            .count())
    }

    /// Mark every message the other side sent in `conversation` as read.
    /// Returns how many changed.
    ///
    /// # Errors
    ///
    /// Returns `StateError::NotFound` if the conversation has no messages,
    /// or a store error if the log cannot be read or written.
    #[instrument(skip(self), fields(conversation = %conversation))]
    pub fn mark_thread_read(&self, conversation: &ConversationId, reader: Sender) -> Result<usize> {
        let mut messages = self.load()?;
        if !messages.iter().any(|m| &m.conversation_id == conversation) {
            return Err(StateError::not_found("conversation", conversation));
        }

        let mut changed = 0;
        for m in messages
            .iter_mut()
            .filter(|m| &m.conversation_id == conversation && m.is_unread_for(reader))
        {
            m.read = true;
            changed += 1;
        }

        if changed > 0 {
            self.store.save_collection(keys::CHAT_MESSAGES, &messages)?;
            info!(changed, "Thread marked read");
        } else {
            debug!("Thread already read");
        }
        Ok(changed)
    }

    /// Append a message and notify the other side.
    ///
    /// The message write must succeed; the notification is best-effort and
    /// never undoes the message. Admin-sent messages are stored already read.
    ///
    /// # Errors
    ///
    /// Returns `StateError::Rejected` for blank text, or a store error
    /// (including `StorageExhausted`) if the message could not be written.
    #[instrument(skip(self, draft), fields(conversation = %draft.conversation_id, sender = %draft.sender))]
    pub fn send_message(&self, draft: MessageDraft) -> Result<Message> {
        let text = draft.text.trim();
        if text.is_empty() {
            return Err(StateError::rejected("message text cannot be empty"));
        }

        let mut messages = self.load()?;
        let display_name = draft
            .display_name
            .filter(|n| !n.trim().is_empty())
            .or_else(|| existing_name(&messages, &draft.conversation_id))
            .unwrap_or_else(|| GUEST_NAME.to_owned());

        let now = self.clock.now();
        let id = next_timestamp_id(
            now.timestamp_millis(),
            messages.iter().map(|m| m.id.as_i64()),
        );
        let message = Message {
            id: MessageId::new(id),
            sender: draft.sender,
            text: text.to_owned(),
            conversation_id: draft.conversation_id,
            display_name,
            timestamp: now,
            read: draft.sender == Sender::Admin,
        };

        messages.push(message.clone());
        self.store.save_collection(keys::CHAT_MESSAGES, &messages)?;
        info!(message_id = %message.id, "Message sent");

        self.notify_recipient(&message);
        Ok(message)
    }

    /// Staff reply into a customer's conversation.
    ///
    /// # Errors
    ///
    /// Same as [`Self::send_message`].
    pub fn reply_as_admin(&self, conversation: &ConversationId, text: &str) -> Result<Message> {
        self.send_message(MessageDraft::from_admin(conversation.clone(), text))
    }

    /// Move every message of `from` into `to`. Returns how many moved.
    ///
    /// # Errors
    ///
    /// Returns an error if the log cannot be read or written.
    #[instrument(skip(self), fields(from = %from, to = %to))]
    pub fn reassign(&self, from: &ConversationId, to: &ConversationId) -> Result<usize> {
        let mut messages = self.load()?;
        let mut moved = 0;
        for m in messages.iter_mut().filter(|m| &m.conversation_id == from) {
            m.conversation_id = to.clone();
            moved += 1;
        }
        if moved > 0 {
            self.store.save_collection(keys::CHAT_MESSAGES, &messages)?;
            info!(moved, "Messages reassigned");
        }
        Ok(moved)
    }

    /// Whether any message belongs to `conversation`.
    ///
    /// # Errors
    ///
    /// Returns an error if the log cannot be read.
    pub fn has_messages(&self, conversation: &ConversationId) -> Result<bool> {
        Ok(self
            .load()?
            .iter()
            .any(|m| &m.conversation_id == conversation))
    }

    fn notify_recipient(&self, message: &Message) {
        let channel = message.sender.recipient_channel();
        let quoted = preview(&message.text, self.preview_chars);
        let (title, body) = match channel {
            Channel::Admin => (
                "New Chat Message",
                format!("New message from {}: {quoted}", message.display_name),
            ),
            Channel::Client => ("New Message from Admin", format!("You have a new message: {quoted}")),
        };
        let payload = Payload::Chat(ChatRef {
            conversation_id: message.conversation_id.clone(),
            message_id: Some(message.id),
        });

        NotificationDispatcher::new(self.store, self.clock)
            .emit_best_effort(channel, title, &body, payload);
    }

    fn load(&self) -> Result<Vec<Message>> {
        Ok(self.store.load_collection(keys::CHAT_MESSAGES)?)
    }
}

/// Name already used in a conversation, taken from its earliest message.
fn existing_name(messages: &[Message], conversation: &ConversationId) -> Option<String> {
    messages
        .iter()
        .filter(|m| &m.conversation_id == conversation)
        .min_by_key(|m| (m.timestamp, m.id))
        .map(|m| m.display_name.clone())
}
