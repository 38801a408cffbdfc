//! Store Adapter: the shared key-value store every execution context reads
//! and writes.
//!
//! # Contract
//!
//! - Values are JSON. Collections are stored whole under one key and always
//!   written back whole (read-modify-write, no partial updates).
//! - Every successful write publishes a [`ChangeEvent`] carrying the key and
//!   the writer's [`ContextId`]. A [`ChangeSubscription`] only yields events
//!   written by *other* contexts.
//! - There is no transaction or compare-and-swap. Two contexts writing the
//!   same key at overlapping times lose one write (last writer wins).
//!
//! # Backends
//!
//! - [`MemoryStore`] - process-local, shared by several contexts (tests, embedding)
//! - [`FileStore`] - one JSON document on disk, shared across processes

pub mod file;
pub mod memory;

use std::sync::Arc;

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use thiserror::Error;
use tokio::sync::broadcast;
use tokio::sync::broadcast::error::TryRecvError;
use tracing::warn;

pub use file::FileStore;
pub use memory::MemoryStore;

/// Keys consumed and produced by this crate.
///
/// These names are the compatibility surface with every other client of the
/// same store and must not change.
pub mod keys {
    /// Flat log of every chat message.
    pub const CHAT_MESSAGES: &str = "chatMessages";
    /// Notifications addressed to store staff.
    pub const ADMIN_NOTIFICATIONS: &str = "adminNotifications";
    /// Notifications addressed to customers.
    pub const CLIENT_NOTIFICATIONS: &str = "clientNotifications";
    /// Every order ever placed.
    pub const ORDERS: &str = "orders";
    /// Featured product ordering.
    pub const FEATURED_PRODUCTS: &str = "featuredProducts";
    /// Home page slideshow ordering.
    pub const SLIDESHOW_IMAGES: &str = "slideshowImages";
    /// Category ordering.
    pub const CATEGORIES: &str = "categories";
    /// Signed-in customer, if any.
    pub const CURRENT_USER: &str = "currentUser";
    /// Durable anonymous visitor id.
    pub const GUEST_ID: &str = "guestId";
    /// Pending and resolved password-reset requests.
    pub const PASSWORD_RESET_REQUESTS: &str = "passwordResetRequests";
}

/// Capacity of the in-process change feed before slow subscribers lag.
const CHANGE_FEED_CAPACITY: usize = 256;

/// Errors that can occur during store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The write would exceed the storage quota.
    #[error("storage quota exhausted writing {key} (limit {limit} bytes)")]
    Exhausted {
        /// Key being written.
        key: String,
        /// Quota that was hit.
        limit: usize,
    },

    /// A value could not be encoded or decoded.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The backing file could not be read or written.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// A key holds a value of the wrong shape.
    #[error("corrupt value under {key}: {reason}")]
    Corrupt {
        /// Offending key.
        key: String,
        /// What was wrong with it.
        reason: String,
    },
}

impl StoreError {
    /// Whether this is a quota failure.
    #[must_use]
    pub const fn is_exhausted(&self) -> bool {
        matches!(self, Self::Exhausted { .. })
    }
}

/// Identity of one execution context (a tab, a window, a CLI process).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ContextId(String);

impl ContextId {
    /// A fresh random context id.
    #[must_use]
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    /// A context id with a fixed name.
    #[must_use]
    pub fn named(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// Returns the id as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ContextId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// A key was overwritten by some context.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeEvent {
    /// Key whose value changed. The new value is not included; readers re-read.
    pub key: String,
    /// Context that performed the write.
    pub source: ContextId,
}

/// What a subscriber should react to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Signal {
    /// Another context rewrote this key.
    Changed(String),
    /// Events were dropped; re-derive everything.
    Resync,
}

/// Publishing half of the change feed, embedded in each backend.
#[derive(Debug, Clone)]
pub struct ChangeFeed {
    tx: broadcast::Sender<ChangeEvent>,
}

impl ChangeFeed {
    /// Create an empty feed.
    #[must_use]
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(CHANGE_FEED_CAPACITY);
        Self { tx }
    }

    /// Announce a write. Having no subscribers is not an error.
    pub fn publish(&self, key: &str, source: &ContextId) {
        let _ = self.tx.send(ChangeEvent {
            key: key.to_owned(),
            source: source.clone(),
        });
    }

    /// Open a raw receiver.
    #[must_use]
    pub fn receiver(&self) -> broadcast::Receiver<ChangeEvent> {
        self.tx.subscribe()
    }
}

impl Default for ChangeFeed {
    fn default() -> Self {
        Self::new()
    }
}

/// A context's view of the change feed, filtering out its own writes.
#[derive(Debug)]
pub struct ChangeSubscription {
    own: ContextId,
    rx: broadcast::Receiver<ChangeEvent>,
}

impl ChangeSubscription {
    /// Wrap a raw receiver for the given context.
    #[must_use]
    pub const fn new(own: ContextId, rx: broadcast::Receiver<ChangeEvent>) -> Self {
        Self { own, rx }
    }

    /// Next pending signal from another context, without blocking.
    pub fn try_next(&mut self) -> Option<Signal> {
        loop {
            match self.rx.try_recv() {
                Ok(event) if event.source == self.own => {}
                Ok(event) => return Some(Signal::Changed(event.key)),
                Err(TryRecvError::Lagged(skipped)) => {
                    warn!(context = %self.own, skipped, "Change feed lagged, forcing resync");
                    return Some(Signal::Resync);
                }
                Err(TryRecvError::Empty | TryRecvError::Closed) => return None,
            }
        }
    }

    /// Every pending signal, in arrival order.
    pub fn drain(&mut self) -> Vec<Signal> {
        std::iter::from_fn(|| self.try_next()).collect()
    }
}

/// Synchronous JSON key-value store shared by every execution context.
pub trait KeyValueStore: Send + Sync {
    /// Current value under `key`, if any.
    ///
    /// # Errors
    ///
    /// Returns `StoreError` if the backend cannot be read.
    fn get(&self, key: &str) -> Result<Option<Value>, StoreError>;

    /// Replace the value under `key` and notify other contexts.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Exhausted` when the quota would be exceeded, or
    /// another `StoreError` if the backend cannot be written.
    fn set(&self, key: &str, value: Value, origin: &ContextId) -> Result<(), StoreError>;

    /// Delete `key` and notify other contexts.
    ///
    /// # Errors
    ///
    /// Returns `StoreError` if the backend cannot be written.
    fn remove(&self, key: &str, origin: &ContextId) -> Result<(), StoreError>;

    /// Receiver for every write made through this backend.
    fn changes(&self) -> broadcast::Receiver<ChangeEvent>;
}

/// Per-context typed handle over a shared backend.
///
/// Cheap to clone. Never caches: every load goes to the backend.
#[derive(Clone)]
pub struct Store {
    backend: Arc<dyn KeyValueStore>,
    context: ContextId,
}

impl std::fmt::Debug for Store {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Store")
            .field("context", &self.context)
            .finish_non_exhaustive()
    }
}

impl Store {
    /// Attach a context to a backend.
    #[must_use]
    pub fn new(backend: Arc<dyn KeyValueStore>, context: ContextId) -> Self {
        Self { backend, context }
    }

    /// The context this handle writes as.
    #[must_use]
    pub const fn context(&self) -> &ContextId {
        &self.context
    }

    /// Load a whole collection. A missing key is an empty collection.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Corrupt` if the key holds something other than
    /// an array, or `StoreError::Serialization` if an element has the wrong
    /// shape.
    pub fn load_collection<T: DeserializeOwned>(&self, key: &str) -> Result<Vec<T>, StoreError> {
        match self.backend.get(key)? {
            None | Some(Value::Null) => Ok(Vec::new()),
            Some(value @ Value::Array(_)) => Ok(serde_json::from_value(value)?),
            Some(other) => Err(StoreError::Corrupt {
                key: key.to_owned(),
                reason: format!("expected an array, found {}", json_type(&other)),
            }),
        }
    }

    /// Write a whole collection back.
    ///
    /// # Errors
    ///
    /// Returns `StoreError` if encoding or the backend write fails.
    pub fn save_collection<T: Serialize>(&self, key: &str, items: &[T]) -> Result<(), StoreError> {
        let value = serde_json::to_value(items)?;
        self.backend.set(key, value, &self.context)
    }

    /// Load a single value.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Serialization` if the stored value has the wrong shape.
    pub fn load_value<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, StoreError> {
        match self.backend.get(key)? {
            None | Some(Value::Null) => Ok(None),
            Some(value) => Ok(Some(serde_json::from_value(value)?)),
        }
    }

    /// Write a single value.
    ///
    /// # Errors
    ///
    /// Returns `StoreError` if encoding or the backend write fails.
    pub fn save_value<T: Serialize>(&self, key: &str, value: &T) -> Result<(), StoreError> {
        let value = serde_json::to_value(value)?;
        self.backend.set(key, value, &self.context)
    }

    /// Delete a key.
    ///
    /// # Errors
    ///
    /// Returns `StoreError` if the backend write fails.
    pub fn remove(&self, key: &str) -> Result<(), StoreError> {
        self.backend.remove(key, &self.context)
    }

    /// Subscribe to writes made by other contexts.
    #[must_use]
    pub fn subscribe(&self) -> ChangeSubscription {
        ChangeSubscription::new(self.context.clone(), self.backend.changes())
    }
}

/// Serialized size used for quota accounting.
pub(crate) fn entry_size(key: &str, value: &Value) -> usize {
    key.len() + value.to_string().len()
}

const fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
