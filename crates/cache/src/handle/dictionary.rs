//! In-memory store backed by a concurrent map

use super::base::BaseCacheHandle;
use super::store::{CacheStore, Insertion, Lookup};
use chrono::{DateTime, Utc};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;
use tiercache_core::{full_key, region_prefix, CacheHandleConfiguration, CacheItem, Result};

/// Handle over a process-local [`DictionaryStore`]
pub type DictionaryCacheHandle<V> = BaseCacheHandle<V, DictionaryStore<V>>;

impl<V> DictionaryCacheHandle<V>
where
    V: Send + Sync,
{
    pub fn dictionary(configuration: CacheHandleConfiguration) -> Self {
        Self::new(configuration, DictionaryStore::new())
    }
}

struct Slot<V> {
    item: Arc<CacheItem<V>>,
    /// Unix millis of the last read, drives sliding expiration
    last_access: AtomicI64,
}

impl<V> Slot<V> {
    fn new(item: CacheItem<V>) -> Self {
        Self {
            item: Arc::new(item),
            last_access: AtomicI64::new(Utc::now().timestamp_millis()),
        }
    }

    fn last_access(&self) -> DateTime<Utc> {
        DateTime::from_timestamp_millis(self.last_access.load(Ordering::Relaxed))
            .unwrap_or_else(|| self.item.created_at())
    }

    fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.item.is_expired_at(now, self.last_access())
    }

    fn touch(&self, now: DateTime<Utc>) {
        self.last_access
            .store(now.timestamp_millis(), Ordering::Relaxed);
    }
}

/// Process-local store. Items expire lazily: an expired item is dropped the
/// next time it is read.
pub struct DictionaryStore<V> {
    items: DashMap<String, Slot<V>>,
}

impl<V> DictionaryStore<V> {
    pub fn new() -> Self {
        Self {
            items: DashMap::new(),
        }
    }
}

impl<V> Default for DictionaryStore<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V> std::fmt::Debug for DictionaryStore<V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DictionaryStore")
            .field("entry_count", &self.items.len())
            .finish()
    }
}

impl<V> CacheStore<V> for DictionaryStore<V>
where
    V: Send + Sync,
{
    fn add_item(&self, item: CacheItem<V>) -> Result<Insertion> {
        match self.items.entry(item.full_key()) {
            Entry::Occupied(mut occupied) => {
                if occupied.get().is_expired(Utc::now()) {
                    occupied.insert(Slot::new(item));
                    Ok(Insertion::ReplacedExpired)
                } else {
                    Ok(Insertion::Exists)
                }
            }
            Entry::Vacant(vacant) => {
                vacant.insert(Slot::new(item));
                Ok(Insertion::Added)
            }
        }
    }

    fn put_item(&self, item: CacheItem<V>) -> Result<bool> {
        let previous = self.items.insert(item.full_key(), Slot::new(item));
        Ok(previous.is_none())
    }

    fn get_item(&self, key: &str, region: Option<&str>) -> Result<Lookup<V>> {
        let full_key = full_key(key, region);
        let now = Utc::now();

        match self.items.get(&full_key) {
            None => return Ok(Lookup::Missing),
            Some(slot) if !slot.is_expired(now) => {
                slot.touch(now);
                return Ok(Lookup::Found(Arc::clone(&slot.item)));
            }
            Some(_) => {}
        }

        // Only drop the entry if it is still the expired one
        match self.items.remove_if(&full_key, |_, slot| slot.is_expired(now)) {
            Some(_) => Ok(Lookup::Expired),
            None => Ok(Lookup::Missing),
        }
    }

    fn remove_item(&self, key: &str, region: Option<&str>) -> Result<bool> {
        // An expired item stays until a read or add drops it
        let now = Utc::now();
        let removed = self
            .items
            .remove_if(&full_key(key, region), |_, slot| !slot.is_expired(now));
        Ok(removed.is_some())
    }

    fn clear(&self) -> Result<()> {
        self.items.clear();
        Ok(())
    }

    fn clear_region(&self, region: &str) -> Result<()> {
        let prefix = region_prefix(region);
        self.items.retain(|key, _| !key.starts_with(&prefix));
        Ok(())
    }

    fn replace_item(
        &self,
        current: &Arc<CacheItem<V>>,
        replacement: CacheItem<V>,
    ) -> Result<bool> {
        match self.items.get_mut(&current.full_key()) {
            Some(mut slot) if Arc::ptr_eq(&slot.item, current) => {
                slot.item = Arc::new(replacement);
                slot.touch(Utc::now());
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    fn count(&self) -> usize {
        self.items.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tiercache_core::ExpirationMode;

    #[test]
    fn test_add_is_test_and_set() {
        let store = DictionaryStore::new();
        let first = store.add_item(CacheItem::new("key", 1).unwrap()).unwrap();
        let second = store.add_item(CacheItem::new("key", 2).unwrap()).unwrap();
        assert_eq!(first, Insertion::Added);
        assert_eq!(second, Insertion::Exists);

        let item = store.get_item("key", None).unwrap().into_item().unwrap();
        assert_eq!(*item.value(), 1);
    }

    #[test]
    fn test_put_reports_new_keys() {
        let store = DictionaryStore::new();
        assert!(store.put_item(CacheItem::new("key", 1).unwrap()).unwrap());
        assert!(!store.put_item(CacheItem::new("key", 2).unwrap()).unwrap());
        assert_eq!(store.count(), 1);
    }

    #[test]
    fn test_regions_are_namespaces() {
        let store = DictionaryStore::new();
        store.put_item(CacheItem::new("key", 1).unwrap()).unwrap();
        store.put_item(CacheItem::in_region("key", "a", 2).unwrap()).unwrap();
        store.put_item(CacheItem::in_region("key", "b", 3).unwrap()).unwrap();
        assert_eq!(store.count(), 3);

        store.clear_region("a").unwrap();
        assert!(!store.get_item("key", Some("a")).unwrap().is_found());
        assert!(store.get_item("key", Some("b")).unwrap().is_found());
        assert!(store.get_item("key", None).unwrap().is_found());

        store.clear().unwrap();
        assert_eq!(store.count(), 0);
    }

    #[test]
    fn test_replace_compares_identity() {
        let store = DictionaryStore::new();
        store.put_item(CacheItem::new("key", 1).unwrap()).unwrap();

        let first = store.get_item("key", None).unwrap().into_item().unwrap();
        assert!(store.replace_item(&first, first.with_value(2)).unwrap());
        // `first` is no longer the stored instance even though it looks alike
        assert!(!store.replace_item(&first, first.with_value(3)).unwrap());

        let current = store.get_item("key", None).unwrap().into_item().unwrap();
        assert_eq!(*current.value(), 2);
    }

    #[test]
    fn test_replace_after_remove_fails() {
        let store = DictionaryStore::new();
        store.put_item(CacheItem::new("key", 1).unwrap()).unwrap();
        let item = store.get_item("key", None).unwrap().into_item().unwrap();
        assert!(store.remove_item("key", None).unwrap());
        assert!(!store.replace_item(&item, item.with_value(2)).unwrap());
        assert_eq!(store.count(), 0);
    }

    #[test]
    fn test_absolute_expiration() {
        let store = DictionaryStore::new();
        let item = CacheItem::with_expiration(
            "key",
            None,
            1,
            ExpirationMode::Absolute,
            Duration::from_millis(30),
        )
        .unwrap();
        store.add_item(item).unwrap();
        assert!(store.get_item("key", None).unwrap().is_found());

        std::thread::sleep(Duration::from_millis(60));
        assert!(matches!(store.get_item("key", None).unwrap(), Lookup::Expired));
        assert!(matches!(store.get_item("key", None).unwrap(), Lookup::Missing));

        // An expired key can be added again
        let item = CacheItem::new("key", 2).unwrap();
        assert_eq!(store.add_item(item).unwrap(), Insertion::Added);
    }

    fn short_lived(key: &str) -> CacheItem<i32> {
        CacheItem::with_expiration(
            key,
            None,
            1,
            ExpirationMode::Absolute,
            Duration::from_millis(20),
        )
        .unwrap()
    }

    #[test]
    fn test_add_over_expired_item_reports_replacement() {
        let store = DictionaryStore::new();
        store.add_item(short_lived("key")).unwrap();
        std::thread::sleep(Duration::from_millis(50));

        let insertion = store.add_item(CacheItem::new("key", 2).unwrap()).unwrap();
        assert_eq!(insertion, Insertion::ReplacedExpired);
        assert!(insertion.is_stored());
        assert_eq!(store.count(), 1);
    }

    #[test]
    fn test_remove_ignores_expired_item() {
        let store = DictionaryStore::new();
        store.add_item(short_lived("key")).unwrap();
        std::thread::sleep(Duration::from_millis(50));

        assert!(!store.remove_item("key", None).unwrap());
        // Still dropped, and reported, by the next read
        assert!(matches!(store.get_item("key", None).unwrap(), Lookup::Expired));
        assert_eq!(store.count(), 0);
    }

    #[test]
    fn test_sliding_expiration_refreshed_by_reads() {
        let store = DictionaryStore::new();
        let item = CacheItem::with_expiration(
            "key",
            None,
            1,
            ExpirationMode::Sliding,
            Duration::from_millis(200),
        )
        .unwrap();
        store.add_item(item).unwrap();

        for _ in 0..4 {
            std::thread::sleep(Duration::from_millis(80));
            assert!(store.get_item("key", None).unwrap().is_found());
        }

        std::thread::sleep(Duration::from_millis(300));
        assert!(!store.get_item("key", None).unwrap().is_found());
    }
}
