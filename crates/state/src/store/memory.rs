//! Process-local store shared by several contexts.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use serde_json::Value;
use tokio::sync::broadcast;

use super::{ChangeEvent, ChangeFeed, ContextId, KeyValueStore, StoreError, entry_size};

/// In-memory backend with an optional quota.
///
/// The quota can be global (sum of every key's serialized size) or per key,
/// which is how tests make one collection run out of room while others
/// still accept writes.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, Value>>,
    quota: Mutex<Quota>,
    feed: ChangeFeed,
}

#[derive(Debug, Default, Clone)]
struct Quota {
    total: Option<usize>,
    per_key: HashMap<String, usize>,
}

impl MemoryStore {
    /// Create an empty store without a quota.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty store that refuses writes once the serialized size of
    /// all entries would exceed `bytes`.
    #[must_use]
    pub fn with_quota(bytes: usize) -> Self {
        let store = Self::new();
        store.lock_quota().total = Some(bytes);
        store
    }

    /// Cap the serialized size of a single key.
    pub fn limit_key(&self, key: &str, bytes: usize) {
        self.lock_quota().per_key.insert(key.to_owned(), bytes);
    }

    /// Lift a per-key cap.
    pub fn unlimit_key(&self, key: &str) {
        self.lock_quota().per_key.remove(key);
    }

    /// Total serialized size currently held.
    #[must_use]
    pub fn used_bytes(&self) -> usize {
        self.lock_entries()
            .iter()
            .map(|(key, value)| entry_size(key, value))
            .sum()
    }

    fn lock_entries(&self) -> MutexGuard<'_, HashMap<String, Value>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn lock_quota(&self) -> MutexGuard<'_, Quota> {
        self.quota.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<Value>, StoreError> {
        Ok(self.lock_entries().get(key).cloned())
    }

    fn set(&self, key: &str, value: Value, origin: &ContextId) -> Result<(), StoreError> {
        {
            let quota = self.lock_quota().clone();
            let mut entries = self.lock_entries();
            let incoming = entry_size(key, &value);

            if let Some(&limit) = quota.per_key.get(key) {
                if incoming > limit {
                    return Err(StoreError::Exhausted {
                        key: key.to_owned(),
                        limit,
                    });
                }
            }

            if let Some(limit) = quota.total {
                let others: usize = entries
                    .iter()
                    .filter(|(existing, _)| existing.as_str() != key)
                    .map(|(existing, v)| entry_size(existing, v))
                    .sum();
                if others + incoming > limit {
                    return Err(StoreError::Exhausted {
                        key: key.to_owned(),
                        limit,
                    });
                }
            }

            entries.insert(key.to_owned(), value);
        }

        self.feed.publish(key, origin);
        Ok(())
    }

    fn remove(&self, key: &str, origin: &ContextId) -> Result<(), StoreError> {
        let removed = self.lock_entries().remove(key).is_some();
        if removed {
            self.feed.publish(key, origin);
        }
        Ok(())
    }

    fn changes(&self) -> broadcast::Receiver<ChangeEvent> {
        self.feed.receiver()
    }
}
