//! Notification commands.

use tracing::info;
use wonder_core::{Channel, NotificationId};
use wonder_state::AppContext;

use super::CommandResult;

/// Print a channel newest first.
///
/// # Errors
///
/// Returns an error if the channel cannot be read.
pub fn list(ctx: &AppContext, channel: Channel, unread_only: bool) -> CommandResult {
    let dispatcher = ctx.notifications();
    let notifications = if unread_only {
        dispatcher.list_unread(channel)?
    } else {
        dispatcher.list(channel)?
    };

    info!(%channel, count = notifications.len(), "Notifications");
    for n in &notifications {
        info!(
            id = %n.id,
            kind = %n.kind(),
            read = n.read,
            at = %n.created_at,
            "{}: {}",
            n.title,
            n.body
        );
    }
    if channel == Channel::Admin {
        info!(badge = ctx.admin_badge_count()?, "Staff badge");
    }
    Ok(())
}

/// Mark one notification read, or all of them when `id` is `None`.
///
/// # Errors
///
/// Returns `StateError::NotFound` for an unknown id, or a store error.
pub fn read(ctx: &AppContext, channel: Channel, id: Option<NotificationId>) -> CommandResult {
    let dispatcher = ctx.notifications();
    match id {
        Some(id) => {
            dispatcher.mark_read(channel, id)?;
            info!(%channel, %id, "Marked read");
        }
        None => {
            let marked = dispatcher.mark_all_read(channel)?;
            info!(%channel, marked, "Marked all read");
        }
    }
    Ok(())
}
