//! Per-context set of open staff chat windows.
//!
//! Each admin context owns one [`ChatWindows`] value and passes it to
//! whatever renders or refreshes threads. Nothing here is shared between
//! contexts or persisted.

use std::collections::BTreeSet;

use tracing::debug;
use wonder_core::{Channel, ConversationId, Sender};

use crate::conversations::ConversationAggregator;
use crate::error::Result;
use crate::notifications::NotificationDispatcher;

/// Result of [`ChatWindows::open`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpenOutcome {
    Opened,
    AlreadyOpen,
}

/// Conversations currently shown in a chat window.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ChatWindows {
    open: BTreeSet<ConversationId>,
}

impl ChatWindows {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Show `conversation`. Staff has now seen the thread, so the customer's
    /// messages and the matching admin chat notifications are marked read,
    /// whether or not the window was already open.
    ///
    /// # Errors
    ///
    /// Returns `StateError::NotFound` if the conversation has no messages
    /// (the window is not opened), or a store error. A failure to mark
    /// notifications read is returned after the thread itself was marked.
    pub fn open(
        &mut self,
        conversation: &ConversationId,
        chats: &ConversationAggregator<'_>,
        notifications: &NotificationDispatcher<'_>,
    ) -> Result<OpenOutcome> {
        chats.mark_thread_read(conversation, Sender::Admin)?;
        let outcome = if self.open.insert(conversation.clone()) {
            OpenOutcome::Opened
        } else {
            OpenOutcome::AlreadyOpen
        };
        let cleared = notifications.mark_conversation_read(Channel::Admin, conversation)?;
        debug!(%conversation, ?outcome, cleared, "Chat window shown");
        Ok(outcome)
    }

    /// Mark whatever arrived in an open window as seen by staff. Returns
    /// how many messages and notifications changed; a closed window is left
    /// alone and yields zero.
    ///
    /// # Errors
    ///
    /// Returns `StateError::NotFound` if the conversation no longer has
    /// messages, or a store error.
    pub fn mark_seen(
        &self,
        conversation: &ConversationId,
        chats: &ConversationAggregator<'_>,
        notifications: &NotificationDispatcher<'_>,
    ) -> Result<usize> {
        if !self.is_open(conversation) {
            return Ok(0);
        }
        let marked = chats.mark_thread_read(conversation, Sender::Admin)?;
        let cleared = notifications.mark_conversation_read(Channel::Admin, conversation)?;
        Ok(marked + cleared)
    }

    /// Stop showing `conversation`. Returns whether it was open.
    pub fn close(&mut self, conversation: &ConversationId) -> bool {
        self.open.remove(conversation)
    }

    #[must_use]
    pub fn is_open(&self, conversation: &ConversationId) -> bool {
        self.open.contains(conversation)
    }

    /// Open conversations in id order.
    pub fn open_ids(&self) -> impl Iterator<Item = &ConversationId> {
        self.open.iter()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.open.is_empty()
    }
}
