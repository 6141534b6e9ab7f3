use chrono::{DateTime, Utc};
use std::sync::Arc;
use tracing::{debug, warn};
use crate::error::StoreError;
use crate::store::{StateKey, StateStore};

/// Which items were already announced, and when the last run finished
#[derive(Clone)]
pub struct DedupStore {
    store: Arc<dyn StateStore>,
}

impl DedupStore {
    pub fn new(store: Arc<dyn StateStore>) -> Self {
        Self { store }
    }

    pub fn has_notified(&self, id: &str) -> Result<bool, StoreError> {
        Ok(self.store.get(&StateKey::item(id))?.is_some())
    }

    /// Record an announced item. Returns `false` when the item was already
    /// recorded, which only happens if another writer got there first.
    pub fn record_notified(&self, id: &str, watched_at: DateTime<Utc>) -> Result<bool, StoreError> {
        let recorded = self.store.compare_and_swap(&StateKey::item(id), None, watched_at)?;
        if !recorded {
            warn!(item_id = id, "Item was already recorded by another writer");
        }
        Ok(recorded)
    }

    pub fn get_cursor(&self) -> Result<Option<DateTime<Utc>>, StoreError> {
        self.store.get(&StateKey::Cursor)
    }

    pub fn set_cursor(&self, at: DateTime<Utc>) -> Result<(), StoreError> {
        self.store.put(&StateKey::Cursor, at)
    }

    /// Drop records whose watched-at time is before `cutoff`
    pub fn prune_older_than(&self, cutoff: DateTime<Utc>) -> Result<usize, StoreError> {
        let expired: Vec<String> = self
            .store
            .items()?
            .into_iter()
            .filter(|(_, watched_at)| *watched_at < cutoff)
            .map(|(id, _)| id)
            .collect();

        if expired.is_empty() {
            return Ok(0);
        }
        let removed = self.store.remove_items(&expired)?;
        debug!(removed, cutoff = %cutoff, "Pruned notification records");
        Ok(removed)
    }

    pub fn len(&self) -> Result<usize, StoreError> {
        Ok(self.store.items()?.len())
    }

    pub fn is_empty(&self) -> Result<bool, StoreError> {
        Ok(self.len()? == 0)
    }

    pub fn records(&self) -> Result<Vec<(String, DateTime<Utc>)>, StoreError> {
        self.store.items()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use chrono::{Duration, TimeZone};

    fn dedup() -> DedupStore {
        DedupStore::new(Arc::new(MemoryStore::new()))
    }

    #[test]
    fn test_record_then_has_notified() {
        let store = dedup();
        let at = Utc.with_ymd_and_hms(2024, 1, 1, 23, 30, 0).unwrap();

        assert!(!store.has_notified("1982346").unwrap());
        assert!(store.record_notified("1982346", at).unwrap());
        assert!(store.has_notified("1982346").unwrap());
        assert!(!store.record_notified("1982346", at).unwrap());
        assert_eq!(store.len().unwrap(), 1);
    }

    #[test]
    fn test_cursor() {
        let store = dedup();
        assert!(store.get_cursor().unwrap().is_none());

        let now = Utc::now();
        store.set_cursor(now).unwrap();
        assert_eq!(store.get_cursor().unwrap(), Some(now));
    }

    #[test]
    fn test_prune_older_than() {
        let store = dedup();
        let now = Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap();
        store.record_notified("old", now - Duration::days(90)).unwrap();
        store.record_notified("recent", now - Duration::days(5)).unwrap();
        store.set_cursor(now).unwrap();

        assert_eq!(store.prune_older_than(now - Duration::days(30)).unwrap(), 1);
        assert!(!store.has_notified("old").unwrap());
        assert!(store.has_notified("recent").unwrap());
        assert_eq!(store.get_cursor().unwrap(), Some(now));
        assert_eq!(store.prune_older_than(now - Duration::days(30)).unwrap(), 0);
    }
}
