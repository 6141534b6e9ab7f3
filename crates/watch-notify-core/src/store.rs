//! Persistent key/value state behind the dedup record.
//!
//! Two kinds of keys exist: one per notified item, mapping to its watched-at
//! timestamp, and a single cursor holding the time of the last completed run.
//! On disk both live in one JSON document:
//!
//! ```json
//! { "items": { "1982346": "2024-01-01T23:30:00.000Z" }, "lastCheck": null }
//! ```

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::debug;
use crate::error::StoreError;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum StateKey {
    Item(String),
    Cursor,
}

impl StateKey {
    pub fn item(id: impl Into<String>) -> Self {
        StateKey::Item(id.into())
    }
}

pub trait StateStore: Send + Sync {
    fn get(&self, key: &StateKey) -> Result<Option<DateTime<Utc>>, StoreError>;

    fn put(&self, key: &StateKey, value: DateTime<Utc>) -> Result<(), StoreError>;

    /// Set `key` to `new` only if it currently holds `expected`.
    /// Returns whether the swap happened.
    fn compare_and_swap(
        &self,
        key: &StateKey,
        expected: Option<DateTime<Utc>>,
        new: DateTime<Utc>,
    ) -> Result<bool, StoreError>;

    /// Returns whether the key held a value
    fn remove(&self, key: &StateKey) -> Result<bool, StoreError>;

    /// Every item record, ordered by id
    fn items(&self) -> Result<Vec<(String, DateTime<Utc>)>, StoreError>;

    fn remove_items(&self, ids: &[String]) -> Result<usize, StoreError> {
        let mut removed = 0;
        for id in ids {
            if self.remove(&StateKey::Item(id.clone()))? {
                removed += 1;
            }
        }
        Ok(removed)
    }
}

/// Timestamp serialized as RFC 3339 UTC with milliseconds and a `Z` suffix
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Stamp(DateTime<Utc>);

impl Serialize for Stamp {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0.to_rfc3339_opts(SecondsFormat::Millis, true))
    }
}

impl<'de> Deserialize<'de> for Stamp {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        DateTime::parse_from_rfc3339(&raw)
            .map(|dt| Stamp(dt.with_timezone(&Utc)))
            .map_err(serde::de::Error::custom)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StateDocument {
    #[serde(default)]
    items: BTreeMap<String, Stamp>,
    #[serde(default)]
    last_check: Option<Stamp>,
}

impl StateDocument {
    fn get(&self, key: &StateKey) -> Option<DateTime<Utc>> {
        match key {
            StateKey::Item(id) => self.items.get(id).map(|s| s.0),
            StateKey::Cursor => self.last_check.map(|s| s.0),
        }
    }

    fn set(&mut self, key: &StateKey, value: DateTime<Utc>) {
        match key {
            StateKey::Item(id) => {
                self.items.insert(id.clone(), Stamp(value));
            }
            StateKey::Cursor => self.last_check = Some(Stamp(value)),
        }
    }

    fn take(&mut self, key: &StateKey) -> bool {
        match key {
            StateKey::Item(id) => self.items.remove(id).is_some(),
            StateKey::Cursor => self.last_check.take().is_some(),
        }
    }

    fn item_list(&self) -> Vec<(String, DateTime<Utc>)> {
        self.items.iter().map(|(id, s)| (id.clone(), s.0)).collect()
    }
}

/// The JSON document on disk. Every call reads the whole file and every
/// mutation rewrites it (temp file, then rename); a mutex serializes the
/// read-modify-write cycles of this process.
pub struct JsonFileStore {
    path: PathBuf,
    guard: Mutex<()>,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            guard: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn io_error(&self, source: std::io::Error) -> StoreError {
        StoreError::Io {
            path: self.path.clone(),
            source,
        }
    }

    fn read_document(&self) -> Result<StateDocument, StoreError> {
        let contents = match std::fs::read_to_string(&self.path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = ?self.path, "State file does not exist yet, starting empty");
                return Ok(StateDocument::default());
            }
            Err(e) => return Err(self.io_error(e)),
        };

        if contents.trim().is_empty() {
            return Ok(StateDocument::default());
        }

        serde_json::from_str(&contents).map_err(|source| StoreError::Corrupt {
            path: self.path.clone(),
            source,
        })
    }

    fn write_document(&self, document: &StateDocument) -> Result<(), StoreError> {
        let encoded = serde_json::to_string_pretty(document).map_err(StoreError::Encode)?;

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| self.io_error(e))?;
        }

        // Atomic write: write to temp file, then rename
        let temp_path = self.path.with_extension("json.tmp");
        std::fs::write(&temp_path, encoded).map_err(|e| self.io_error(e))?;
        std::fs::rename(&temp_path, &self.path).map_err(|e| self.io_error(e))?;

        debug!(path = ?self.path, items = document.items.len(), "Saved state file");
        Ok(())
    }

    fn update<T>(&self, mutate: impl FnOnce(&mut StateDocument) -> (T, bool)) -> Result<T, StoreError> {
        let _lock = self.guard.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        let mut document = self.read_document()?;
        let (result, changed) = mutate(&mut document);
        if changed {
            self.write_document(&document)?;
        }
        Ok(result)
    }

    fn read<T>(&self, view: impl FnOnce(&StateDocument) -> T) -> Result<T, StoreError> {
        let _lock = self.guard.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        Ok(view(&self.read_document()?))
    }
}

impl StateStore for JsonFileStore {
    fn get(&self, key: &StateKey) -> Result<Option<DateTime<Utc>>, StoreError> {
        self.read(|doc| doc.get(key))
    }

    fn put(&self, key: &StateKey, value: DateTime<Utc>) -> Result<(), StoreError> {
        self.update(|doc| {
            doc.set(key, value);
            ((), true)
        })
    }

    fn compare_and_swap(
        &self,
        key: &StateKey,
        expected: Option<DateTime<Utc>>,
        new: DateTime<Utc>,
    ) -> Result<bool, StoreError> {
        self.update(|doc| {
            if doc.get(key) != expected {
                return (false, false);
            }
            doc.set(key, new);
            (true, true)
        })
    }

    fn remove(&self, key: &StateKey) -> Result<bool, StoreError> {
        self.update(|doc| {
            let removed = doc.take(key);
            (removed, removed)
        })
    }

    fn items(&self) -> Result<Vec<(String, DateTime<Utc>)>, StoreError> {
        self.read(StateDocument::item_list)
    }

    fn remove_items(&self, ids: &[String]) -> Result<usize, StoreError> {
        self.update(|doc| {
            let removed = ids.iter().filter(|id| doc.items.remove(*id).is_some()).count();
            (removed, removed > 0)
        })
    }
}

/// In-memory state for tests and dry runs
#[derive(Default)]
pub struct MemoryStore {
    document: Mutex<StateDocument>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy every record and the cursor out of another store
    pub fn snapshot_of(store: &dyn StateStore) -> Result<Self, StoreError> {
        let mut document = StateDocument::default();
        for (id, watched_at) in store.items()? {
            document.items.insert(id, Stamp(watched_at));
        }
        document.last_check = store.get(&StateKey::Cursor)?.map(Stamp);
        Ok(Self {
            document: Mutex::new(document),
        })
    }

    fn with<T>(&self, f: impl FnOnce(&mut StateDocument) -> T) -> T {
        let mut document = self.document.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        f(&mut document)
    }
}

impl StateStore for MemoryStore {
    fn get(&self, key: &StateKey) -> Result<Option<DateTime<Utc>>, StoreError> {
        Ok(self.with(|doc| doc.get(key)))
    }

    fn put(&self, key: &StateKey, value: DateTime<Utc>) -> Result<(), StoreError> {
        self.with(|doc| doc.set(key, value));
        Ok(())
    }

    fn compare_and_swap(
        &self,
        key: &StateKey,
        expected: Option<DateTime<Utc>>,
        new: DateTime<Utc>,
    ) -> Result<bool, StoreError> {
        Ok(self.with(|doc| {
            if doc.get(key) != expected {
                return false;
            }
            doc.set(key, new);
            true
        }))
    }

    fn remove(&self, key: &StateKey) -> Result<bool, StoreError> {
        Ok(self.with(|doc| doc.take(key)))
    }

    fn items(&self) -> Result<Vec<(String, DateTime<Utc>)>, StoreError> {
        Ok(self.with(|doc| doc.item_list()))
    }
}
