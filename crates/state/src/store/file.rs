//! JSON-file store shared across processes.
//!
//! The whole store is one JSON object on disk. Reads always go to the file.
//! Writes re-read the file, replace one key, and atomically swap in a new
//! file (write to a sibling temp file, then rename). Other processes notice
//! changes by polling [`FileStore::revision`].

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};
use std::time::SystemTime;

use serde_json::{Map, Value};
use tokio::sync::broadcast;
use tracing::debug;

use super::{ChangeEvent, ChangeFeed, ContextId, KeyValueStore, StoreError, entry_size};

/// File-backed store.
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    quota_bytes: Option<usize>,
    write_lock: Mutex<()>,
    feed: ChangeFeed,
}

impl FileStore {
    /// Open (or lazily create) a store at `path`.
    #[must_use]
    pub fn open(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            quota_bytes: None,
            write_lock: Mutex::new(()),
            feed: ChangeFeed::new(),
        }
    }

    /// Refuse writes once the serialized entries would exceed `bytes`.
    #[must_use]
    pub const fn with_quota(mut self, bytes: usize) -> Self {
        self.quota_bytes = Some(bytes);
        self
    }

    /// Location of the backing file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Last modification time of the backing file, `None` if it does not
    /// exist yet. Changes whenever any process writes.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Io` if the file metadata cannot be read.
    pub fn revision(&self) -> Result<Option<SystemTime>, StoreError> {
        match fs::metadata(&self.path) {
            Ok(meta) => Ok(Some(meta.modified()?)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn read_all(&self) -> Result<Map<String, Value>, StoreError> {
        let raw = match fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Map::new()),
            Err(e) => return Err(e.into()),
        };

        if raw.trim().is_empty() {
            return Ok(Map::new());
        }

        match serde_json::from_str::<Value>(&raw)? {
            Value::Object(map) => Ok(map),
            _ => Err(StoreError::Corrupt {
                key: self.path.display().to_string(),
                reason: "store file is not a JSON object".to_owned(),
            }),
        }
    }

    fn write_all(&self, entries: &Map<String, Value>) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        // Per-write name so concurrent processes never rename each other's file.
        let tmp = self
            .path
            .with_extension(format!("json.{}.tmp", uuid::Uuid::new_v4().simple()));
        fs::write(&tmp, serde_json::to_vec_pretty(entries)?)?;
        fs::rename(&tmp, &self.path)?;
        Ok(())
    }

    fn check_quota(&self, entries: &Map<String, Value>, key: &str) -> Result<(), StoreError> {
        let Some(limit) = self.quota_bytes else {
            return Ok(());
        };
        let used: usize = entries.iter().map(|(k, v)| entry_size(k, v)).sum();
        if used > limit {
            return Err(StoreError::Exhausted {
                key: key.to_owned(),
                limit,
            });
        }
        Ok(())
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<Value>, StoreError> {
        Ok(self.read_all()?.remove(key))
    }

    fn set(&self, key: &str, value: Value, origin: &ContextId) -> Result<(), StoreError> {
        {
            let _guard = self.write_lock.lock().unwrap_or_else(PoisonError::into_inner);
            let mut entries = self.read_all()?;
            entries.insert(key.to_owned(), value);
            self.check_quota(&entries, key)?;
            self.write_all(&entries)?;
        }

        debug!(key, path = %self.path.display(), "Wrote store file");
        self.feed.publish(key, origin);
        Ok(())
    }

    fn remove(&self, key: &str, origin: &ContextId) -> Result<(), StoreError> {
        let removed = {
            let _guard = self.write_lock.lock().unwrap_or_else(PoisonError::into_inner);
            let mut entries = self.read_all()?;
            let removed = entries.remove(key).is_some();
            if removed {
                self.write_all(&entries)?;
            }
            removed
        };

        if removed {
            self.feed.publish(key, origin);
        }
        Ok(())
    }

    fn changes(&self) -> broadcast::Receiver<ChangeEvent> {
        self.feed.receiver()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use serde_json::json;

    use super::*;

    fn temp_path(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("wonder-store-{name}-{}.json", uuid::Uuid::new_v4()))
    }

    #[test]
    fn test_missing_file_reads_as_empty() {
        let store = FileStore::open(temp_path("missing"));
        assert_eq!(store.get("chatMessages").unwrap(), None);
        assert_eq!(store.revision().unwrap(), None);
    }

    #[test]
    fn test_two_handles_share_the_file() {
        let path = temp_path("shared");
        let writer = FileStore::open(&path);
        let reader = FileStore::open(&path);

        writer.set("orders", json!([{"id": 1}]), &ContextId::named("w")).unwrap();

        assert_eq!(reader.get("orders").unwrap(), Some(json!([{"id": 1}])));
        assert!(reader.revision().unwrap().is_some());
        fs::remove_file(path).unwrap();
    }

    #[test]
    fn test_set_preserves_other_keys() {
        let path = temp_path("preserve");
        let store = FileStore::open(&path);
        let ctx = ContextId::named("w");

        store.set("a", json!(1), &ctx).unwrap();
        store.set("b", json!(2), &ctx).unwrap();
        store.remove("a", &ctx).unwrap();

        assert_eq!(store.get("a").unwrap(), None);
        assert_eq!(store.get("b").unwrap(), Some(json!(2)));
        fs::remove_file(path).unwrap();
    }

    #[test]
    fn test_quota_leaves_file_untouched() {
        let path = temp_path("quota");
        let store = FileStore::open(&path).with_quota(8);
        let ctx = ContextId::named("w");

        store.set("a", json!(1), &ctx).unwrap();
        let err = store.set("b", json!("much too long"), &ctx).unwrap_err();

        assert!(err.is_exhausted());
        assert_eq!(store.get("b").unwrap(), None);
        fs::remove_file(path).unwrap();
    }

    #[test]
    fn test_concurrent_writers_both_land() {
        let path = temp_path("concurrent");
        let handles: Vec<_> = (0..4)
            .map(|i| {
                let path = path.clone();
                std::thread::spawn(move || {
                    // Separate handles share no lock, like separate processes.
                    let store = FileStore::open(&path);
                    for n in 0..10 {
                        store.set(&format!("k{i}"), json!(n), &ContextId::named("w")).unwrap();
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        let leftovers = fs::read_dir(path.parent().unwrap())
            .unwrap()
            .filter_map(Result::ok)
            .filter(|e| {
                let name = e.file_name().to_string_lossy().into_owned();
                name.starts_with(&*path.file_stem().unwrap().to_string_lossy())
                    && name.ends_with(".tmp")
            })
            .count();
        assert_eq!(leftovers, 0);
        assert!(FileStore::open(&path).get("k0").is_ok());
        fs::remove_file(path).unwrap();
    }

    #[test]
    fn test_non_object_file_is_corrupt() {
        let path = temp_path("corrupt");
        fs::write(&path, "[1,2,3]").unwrap();
        let store = FileStore::open(&path);

        assert!(matches!(store.get("a"), Err(StoreError::Corrupt { .. })));
        fs::remove_file(path).unwrap();
    }
}
