//! Follow the store from a terminal.
//!
//! Writes from other processes never reach this process's change feed, so
//! the watcher polls the store file's modification time on
//! `WONDER_POLL_INTERVAL_SECS` and re-derives the whole view whenever it
//! moves. Stops on Ctrl-C.

use std::sync::Arc;

use tokio::time::{self, MissedTickBehavior};
use tracing::{info, warn};
use wonder_core::ConversationId;
use wonder_state::{
    AppContext, ChatWindows, FileStore, ReplyWatcher, StateConfig, Synchronizer, SystemClock,
    ViewUpdate, Viewer,
};

use super::CommandResult;

/// Log what a refreshed view contains.
fn log_update(update: &ViewUpdate) {
    if let Some(conversations) = &update.conversations {
        let unread: usize = conversations.iter().map(|c| c.unread_count).sum();
        info!(conversations = conversations.len(), unread, "Conversations refreshed");
    }
    for (conversation, thread) in &update.threads {
        info!(%conversation, messages = thread.len(), "Thread refreshed");
    }
    if let Some(badge) = update.badge {
        info!(
            total = badge.total(),
            notifications = badge.notifications,
            pending = badge.pending,
            "Badge"
        );
    }
    if let Some(orders) = &update.orders {
        info!(orders = orders.len(), "Orders refreshed");
    }
}

/// Watch the store as `viewer` until interrupted.
///
/// `open` lists the conversations an admin viewer keeps chat windows open
/// for; opening one marks it read, as in the staff panel.
///
/// # Errors
///
/// Returns an error if an admin window cannot be opened.
pub async fn run(config: StateConfig, viewer: Viewer, open: &[ConversationId]) -> CommandResult {
    let mut file = FileStore::open(&config.store_path);
    if let Some(quota) = config.store_quota_bytes {
        file = file.with_quota(quota);
    }
    let file = Arc::new(file);
    let interval = config.poll_interval;
    let ctx = AppContext::new(file.clone(), Arc::new(SystemClock), config);

    let mut windows = ChatWindows::new();
    for conversation in open {
        windows.open(conversation, &ctx.conversations(), &ctx.notifications())?;
    }

    let mut replies = match &viewer {
        Viewer::Client(id) => Some(ReplyWatcher::new(id.clone(), ctx.clock().now())),
        Viewer::Admin => None,
    };

    let mut sync = Synchronizer::new(ctx.clone(), viewer);
    sync.observe(log_update);
    info!(
        store = %file.path().display(),
        viewer = ?sync.viewer(),
        interval_secs = interval.as_secs(),
        "Watching"
    );
    sync.refresh_all(&windows);

    let mut last_revision = revision(&file);
    let mut ticker = time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                info!("Stopping");
                return Ok(());
            }
            _ = ticker.tick() => {}
        }

        let current = revision(&file);
        if current != last_revision {
            last_revision = current;
            sync.refresh_all(&windows);
        }

        if let Some(watcher) = replies.as_mut() {
            match watcher.check(&ctx.conversations()) {
                Ok(Some(reply)) => info!(at = %reply.timestamp, "New reply: {}", reply.text),
                Ok(None) => {}
                Err(e) => warn!(error = %e, "Reply check failed"),
            }
        }
    }
}

fn revision(file: &FileStore) -> Option<std::time::SystemTime> {
    file.revision().unwrap_or_else(|e| {
        warn!(error = %e, "Failed to stat store file");
        None
    })
}
