//! Cross-Tab Synchronizer: turns other contexts' writes into refreshed views.
//!
//! Reconciliation is pull-based. A change signal only says which key was
//! rewritten; the synchronizer re-derives the affected view parts from the
//! store and hands them to its observers. Nothing is merged and nothing is
//! ever emitted from here.

use chrono::{DateTime, Utc};
use tracing::{debug, warn};
use wonder_core::{Channel, ConversationId, NotificationKind, Sender};

use crate::context::AppContext;
use crate::conversations::ConversationAggregator;
use crate::error::Result;
use crate::models::{Conversation, Message, Order};
use crate::sessions::ChatWindows;
use crate::store::{ChangeSubscription, Signal, keys};

/// Whose view is being kept current.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Viewer {
    /// Staff: conversation list, open chat windows, orders, staff badge.
    Admin,
    /// A customer: their own thread and badge.
    Client(ConversationId),
}

impl Viewer {
    const fn role(&self) -> Sender {
        match self {
            Self::Admin => Sender::Admin,
            Self::Client(_) => Sender::Client,
        }
    }
}

/// Counts behind a notification badge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Badge {
    /// Unread notifications on the viewer's channel.
    pub notifications: usize,
    /// Pending password resets. Always zero for a customer.
    pub pending: usize,
}

impl Badge {
    #[must_use]
    pub const fn total(&self) -> usize {
        self.notifications + self.pending
    }
}

/// Freshly derived view parts. `None` means the part was not affected or
/// could not be read this round.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ViewUpdate {
    pub conversations: Option<Vec<Conversation>>,
    pub threads: Vec<(ConversationId, Vec<Message>)>,
    pub badge: Option<Badge>,
    pub orders: Option<Vec<Order>>,
}

/// Receives every [`ViewUpdate`] a synchronizer produces.
pub trait ViewObserver: Send {
    fn on_update(&mut self, update: &ViewUpdate);
}

impl<F: FnMut(&ViewUpdate) + Send> ViewObserver for F {
    fn on_update(&mut self, update: &ViewUpdate) {
        self(update);
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
struct Dirty {
    conversations: bool,
    badge: bool,
    orders: bool,
}

impl Dirty {
    const ALL: Self = Self {
        conversations: true,
        badge: true,
        orders: true,
    };

    const fn any(self) -> bool {
        self.conversations || self.badge || self.orders
    }
}

/// Keeps one context's view in step with writes from other contexts.
pub struct Synchronizer {
    ctx: AppContext,
    viewer: Viewer,
    feed: ChangeSubscription,
    observers: Vec<Box<dyn ViewObserver>>,
}

impl Synchronizer {
    /// Subscribe to the store's change feed on behalf of `viewer`.
    #[must_use]
    pub fn new(ctx: AppContext, viewer: Viewer) -> Self {
        let feed = ctx.store().subscribe();
        Self {
            ctx,
            viewer,
            feed,
            observers: Vec::new(),
        }
    }

    #[must_use]
    pub const fn viewer(&self) -> &Viewer {
        &self.viewer
    }

    /// Register an observer for every future update.
    pub fn observe(&mut self, observer: impl ViewObserver + 'static) {
        self.observers.push(Box::new(observer));
    }

    /// Drain pending change signals and refresh whatever they touched.
    /// Returns `None` when nothing relevant changed.
    pub fn poll(&mut self, windows: &ChatWindows) -> Option<ViewUpdate> {
        let mut dirty = Dirty::default();
        for signal in self.feed.drain() {
            match signal {
                Signal::Resync => dirty = Dirty::ALL,
                Signal::Changed(key) => self.mark(&mut dirty, &key),
            }
        }

        if !dirty.any() {
            return None;
        }
        Some(self.refresh(dirty, windows))
    }

    /// Re-derive every view part regardless of pending signals.
    pub fn refresh_all(&mut self, windows: &ChatWindows) -> ViewUpdate {
        // Anything queued is covered by this refresh.
        self.feed.drain();
        self.refresh(Dirty::ALL, windows)
    }

    fn mark(&self, dirty: &mut Dirty, key: &str) {
        let admin = matches!(self.viewer, Viewer::Admin);
        match key {
            keys::CHAT_MESSAGES => dirty.conversations = true,
            keys::ADMIN_NOTIFICATIONS | keys::PASSWORD_RESET_REQUESTS if admin => dirty.badge = true,
            keys::CLIENT_NOTIFICATIONS if !admin => dirty.badge = true,
            keys::ORDERS if admin => dirty.orders = true,
            other => debug!(key = other, "Ignoring change to unrelated key"),
        }
    }

    fn refresh(&mut self, mut dirty: Dirty, windows: &ChatWindows) -> ViewUpdate {
        let mut update = ViewUpdate::default();
        let chats = self.ctx.conversations();

        if dirty.conversations {
            match &self.viewer {
                Viewer::Admin => {
                    // Staff is looking at open windows, so new messages there
                    // are read before the list counts them.
                    let notifications = self.ctx.notifications();
                    for id in windows.open_ids() {
                        let seen =
                            secondary("window", windows.mark_seen(id, &chats, &notifications));
                        dirty.badge |= seen.is_some_and(|n| n > 0);
                    }
                    update.conversations = secondary(
                        "conversations",
                        chats.list_conversations(self.viewer.role()),
                    );
                    for id in windows.open_ids() {
                        if let Some(thread) = secondary("thread", chats.load_thread(id)) {
                            update.threads.push((id.clone(), thread));
                        }
                    }
                }
                Viewer::Client(id) => {
                    if let Some(thread) = secondary("thread", chats.load_thread(id)) {
                        update.threads.push((id.clone(), thread));
                    }
                }
            }
        }

        if dirty.badge {
            update.badge = secondary("badge", self.badge());
        }

        if dirty.orders && matches!(self.viewer, Viewer::Admin) {
            update.orders = secondary("orders", self.ctx.orders().list());
        }

        for observer in &mut self.observers {
            observer.on_update(&update);
        }
        update
    }

    fn badge(&self) -> Result<Badge> {
        let notifications = self.ctx.notifications();
        match &self.viewer {
            Viewer::Admin => Ok(Badge {
                notifications: notifications.unread_count(Channel::Admin)?,
                pending: self.ctx.password_resets().pending()?.len(),
            }),
            Viewer::Client(id) => Ok(Badge {
                notifications: notifications
                    .list_unread(Channel::Client)?
                    .iter()
                    .filter(|n| n.kind() != NotificationKind::Chat || n.concerns_conversation(id))
                    .count(),
                pending: 0,
            }),
        }
    }
}

/// Secondary read path: log and skip failures.
fn secondary<T>(part: &str, result: Result<T>) -> Option<T> {
    match result {
        Ok(value) => Some(value),
        Err(e) => {
            warn!(part, error = %e, "Failed to refresh view part");
            None
        }
    }
}

/// Fixed-interval fallback for noticing staff replies.
///
/// Remembers the newest reply already reported and reports a newer one
/// exactly once.
#[derive(Debug, Clone)]
pub struct ReplyWatcher {
    conversation: ConversationId,
    last_seen: DateTime<Utc>,
}

impl ReplyWatcher {
    /// Watch `conversation`, ignoring replies at or before `since`.
    #[must_use]
    pub const fn new(conversation: ConversationId, since: DateTime<Utc>) -> Self {
        Self {
            conversation,
            last_seen: since,
        }
    }

    /// The latest message of the thread, if it is a staff reply newer than
    /// anything reported before.
    ///
    /// # Errors
    ///
    /// Returns an error if the chat log cannot be read.
    pub fn check(&mut self, chats: &ConversationAggregator<'_>) -> Result<Option<Message>> {
        let thread = chats.load_thread(&self.conversation)?;
        let Some(latest) = thread.into_iter().last() else {
            return Ok(None);
        };
        if latest.sender != Sender::Admin || latest.timestamp <= self.last_seen {
            return Ok(None);
        }
        self.last_seen = latest.timestamp;
        Ok(Some(latest))
    }
}
