//! Chat commands.
//!
//! # Usage
//!
//! ```bash
//! # Send as the current customer (signed-in email or guest id)
//! wonder chat send "Is the X100 in stock?"
//!
//! # Reply as staff
//! wonder chat send --as admin --conversation jane@example.com "Yes, ships today"
//!
//! # Staff conversation list and one thread
//! wonder chat list
//! wonder chat thread jane@example.com
//! ```

use tracing::info;
use wonder_core::{ConversationId, Sender};
use wonder_state::AppContext;
use wonder_state::models::{MessageDraft, preview};

use super::{CommandError, CommandResult};

/// Characters of the last message shown per conversation in the list.
const LIST_PREVIEW_CHARS: usize = 40;

/// Send one message.
///
/// Customers default to their resolved identity; staff must name the
/// conversation they answer.
///
/// # Errors
///
/// Returns an error if the identity cannot be resolved, the text is blank,
/// or the message cannot be stored.
pub fn send(
    ctx: &AppContext,
    sender: Sender,
    conversation: Option<ConversationId>,
    name: Option<String>,
    text: &str,
) -> CommandResult {
    let chats = ctx.conversations();
    let message = match sender {
        Sender::Admin => {
            let conversation = conversation.ok_or_else(|| {
                CommandError::InvalidArgument("--conversation is required when sending as admin".to_owned())
            })?;
            chats.reply_as_admin(&conversation, text)?
        }
        Sender::Client => {
            let identity = ctx.identity();
            let conversation = match conversation {
                Some(c) => c,
                None => identity.resolve()?,
            };
            let name = match name {
                Some(n) => n,
                None => identity.display_name()?,
            };
            chats.send_message(MessageDraft::from_client(conversation, name, text))?
        }
    };

    info!(
        id = %message.id,
        conversation = %message.conversation_id,
        "Sent"
    );
    Ok(())
}

/// Print every conversation, most recent activity first.
///
/// # Errors
///
/// Returns an error if the chat log cannot be read.
pub fn list(ctx: &AppContext, viewer: Sender) -> CommandResult {
    let conversations = ctx.conversations().list_conversations(viewer)?;
    if conversations.is_empty() {
        info!("No conversations");
    }
    for c in &conversations {
        info!(
            conversation = %c.conversation_id,
            name = %c.display_name,
            unread = c.unread_count,
            last = %c.last_activity(),
            "{}",
            c.preview(LIST_PREVIEW_CHARS)
        );
    }
    Ok(())
}

/// Print one thread oldest first.
///
/// # Errors
///
/// Returns an error if the chat log cannot be read.
pub fn thread(ctx: &AppContext, conversation: &ConversationId) -> CommandResult {
    let messages = ctx.conversations().load_thread(conversation)?;
    if messages.is_empty() {
        info!(%conversation, "No messages");
    }
    for m in &messages {
        info!(
            at = %m.timestamp,
            sender = %m.sender,
            read = m.read,
            "{}: {}",
            m.display_name,
            preview(&m.text, 200)
        );
    }
    Ok(())
}

/// Mark a thread read on behalf of `reader`.
///
/// # Errors
///
/// Returns `StateError::NotFound` for an unknown conversation, or a store
/// error.
pub fn read(ctx: &AppContext, conversation: &ConversationId, reader: Sender) -> CommandResult {
    let marked = ctx.conversations().mark_thread_read(conversation, reader)?;
    let cleared = ctx
        .notifications()
        .mark_conversation_read(reader.opposite().recipient_channel(), conversation)?;
    info!(%conversation, marked, cleared, "Thread marked read");
    Ok(())
}
