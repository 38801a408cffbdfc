//! Everything one execution context needs, bundled for cheap cloning.

use std::sync::Arc;

use crate::clock::{Clock, SystemClock};
use crate::config::StateConfig;
use crate::conversations::ConversationAggregator;
use crate::error::Result;
use crate::identity::IdentityResolver;
use crate::models::{Category, FeaturedEntry, SlideshowImage};
use crate::notifications::NotificationDispatcher;
use crate::ordering::OrderedCollection;
use crate::orders::OrderStateMachine;
use crate::password_reset::{PasswordResets, admin_badge_count};
use crate::store::{ContextId, FileStore, KeyValueStore, Store};

/// Shared state of one execution context (a tab, a window, a CLI run).
///
/// The services it hands out borrow from it and are meant to be created per
/// call; none of them caches anything.
#[derive(Clone)]
pub struct AppContext {
    inner: Arc<AppContextInner>,
}

struct AppContextInner {
    store: Store,
    clock: Arc<dyn Clock>,
    config: StateConfig,
}

impl std::fmt::Debug for AppContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppContext")
            .field("context", self.inner.store.context())
            .field("config", &self.inner.config)
            .finish_non_exhaustive()
    }
}

impl AppContext {
    /// Attach to `backend` under the context id from `config`.
    #[must_use]
    pub fn new(backend: Arc<dyn KeyValueStore>, clock: Arc<dyn Clock>, config: StateConfig) -> Self {
        let context = config.context();
        Self::with_context(backend, context, clock, config)
    }

    /// Attach to `backend` under an explicit context id.
    #[must_use]
    pub fn with_context(
        backend: Arc<dyn KeyValueStore>,
        context: ContextId,
        clock: Arc<dyn Clock>,
        config: StateConfig,
    ) -> Self {
        Self {
            inner: Arc::new(AppContextInner {
                store: Store::new(backend, context),
                clock,
                config,
            }),
        }
    }

    /// JSON-file store at `config.store_path`, system clock.
    #[must_use]
    pub fn from_config(config: StateConfig) -> Self {
        let mut file = FileStore::open(&config.store_path);
        if let Some(quota) = config.store_quota_bytes {
            file = file.with_quota(quota);
        }
        Self::new(Arc::new(file), Arc::new(SystemClock), config)
    }

    #[must_use]
    pub fn store(&self) -> &Store {
        &self.inner.store
    }

    #[must_use]
    pub fn clock(&self) -> &dyn Clock {
        self.inner.clock.as_ref()
    }

    #[must_use]
    pub fn config(&self) -> &StateConfig {
        &self.inner.config
    }

    #[must_use]
    pub fn identity(&self) -> IdentityResolver<'_> {
        IdentityResolver::new(self.store(), self.clock())
    }

    #[must_use]
    pub fn conversations(&self) -> ConversationAggregator<'_> {
        ConversationAggregator::new(self.store(), self.clock(), self.inner.config.preview_chars)
    }

    #[must_use]
    pub fn notifications(&self) -> NotificationDispatcher<'_> {
        NotificationDispatcher::new(self.store(), self.clock())
    }

    #[must_use]
    pub fn orders(&self) -> OrderStateMachine<'_> {
        OrderStateMachine::new(self.store(), self.clock())
    }

    #[must_use]
    pub fn password_resets(&self) -> PasswordResets<'_> {
        PasswordResets::new(self.store(), self.clock())
    }

    #[must_use]
    pub fn featured(&self) -> OrderedCollection<'_, FeaturedEntry> {
        OrderedCollection::featured(self.store())
    }

    #[must_use]
    pub fn slideshow(&self) -> OrderedCollection<'_, SlideshowImage> {
        OrderedCollection::slideshow(self.store())
    }

    #[must_use]
    pub fn categories(&self) -> OrderedCollection<'_, Category> {
        OrderedCollection::categories(self.store())
    }

    /// Staff badge: unread admin notifications plus pending reset requests.
    ///
    /// # Errors
    ///
    /// Returns an error if either collection cannot be read.
    pub fn admin_badge_count(&self) -> Result<usize> {
        admin_badge_count(self.store(), self.clock())
    }
}
