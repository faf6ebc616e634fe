//! Generic handle composed from a store

use super::store::{CacheStore, Insertion, Lookup};
use super::CacheHandle;
use crate::stats::CacheStats;
use std::marker::PhantomData;
use tiercache_core::{
    validate_address, validate_region, CacheHandleConfiguration, CacheItem, ExpirationMode,
    Result, UpdateItemConfig, UpdateItemResult,
};
use tracing::trace;

/// Handle that validates arguments, keeps statistics and applies the
/// configured default expiration before delegating to `S`.
///
/// Statistics rules:
/// - `add` counts `AddCalls` and `Items` only when the item was stored
/// - `propagate_add` always counts `AddCalls`, and `Items` when it stored
/// - `put` always counts `PutCalls`, and `Items` when the key was new
/// - `get` counts `GetCalls` plus either `Hits` or `Misses`
/// - `remove` always counts `RemoveCalls`
/// - `update` counts like a get, plus `PutCalls` when the value was written
pub struct BaseCacheHandle<V, S> {
    configuration: CacheHandleConfiguration,
    store: S,
    stats: CacheStats,
    _value: PhantomData<fn() -> V>,
}

impl<V, S> BaseCacheHandle<V, S>
where
    S: CacheStore<V>,
{
    pub fn new(configuration: CacheHandleConfiguration, store: S) -> Self {
        let stats = CacheStats::new(
            configuration.handle_name.clone(),
            configuration.enable_statistics,
        );
        Self {
            configuration,
            store,
            stats,
            _value: PhantomData,
        }
    }

    /// The backing store
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Add through the store, accounting for an expired item it replaced
    fn insert(&self, item: CacheItem<V>, region: Option<&str>) -> Result<Insertion> {
        let insertion = self.store.add_item(self.with_default_expiration(item))?;
        if insertion == Insertion::ReplacedExpired {
            self.stats.on_expired(region);
        }
        Ok(insertion)
    }

    fn with_default_expiration(&self, item: CacheItem<V>) -> CacheItem<V> {
        let mode = self.configuration.expiration_mode;
        if item.expiration_mode() == ExpirationMode::None && mode != ExpirationMode::None {
            item.with_expiration_settings(mode, self.configuration.expiration_timeout)
        } else {
            item
        }
    }
}

impl<V, S> CacheHandle<V> for BaseCacheHandle<V, S>
where
    V: Clone,
    S: CacheStore<V>,
{
    fn name(&self) -> &str {
        &self.configuration.handle_name
    }

    fn configuration(&self) -> &CacheHandleConfiguration {
        &self.configuration
    }

    fn add(&self, item: CacheItem<V>) -> Result<bool> {
        let region = item.region().map(str::to_owned);
        let key = item.key().to_owned();
        let added = self.insert(item, region.as_deref())?.is_stored();
        if added {
            self.stats.on_add(region.as_deref(), true);
        }
        trace!(handle = %self.name(), %key, ?region, added, "add");
        Ok(added)
    }

    fn propagate_add(&self, item: CacheItem<V>) -> Result<bool> {
        let region = item.region().map(str::to_owned);
        let key = item.key().to_owned();
        let added = self.insert(item, region.as_deref())?.is_stored();
        self.stats.on_add(region.as_deref(), added);
        trace!(handle = %self.name(), %key, ?region, added, "propagated add");
        Ok(added)
    }

    fn put(&self, item: CacheItem<V>) -> Result<()> {
        let region = item.region().map(str::to_owned);
        let created = self.store.put_item(self.with_default_expiration(item))?;
        self.stats.on_put(region.as_deref(), created);
        Ok(())
    }

    fn get(&self, key: &str, region: Option<&str>) -> Result<Option<CacheItem<V>>> {
        validate_address(key, region)?;
        self.stats.on_get(region);

        match self.store.get_item(key, region)? {
            Lookup::Found(item) => {
                self.stats.on_hit(region);
                Ok(Some(CacheItem::clone(&item)))
            }
            Lookup::Expired => {
                trace!(handle = %self.name(), key, ?region, "Item expired");
                self.stats.on_expired(region);
                self.stats.on_miss(region);
                Ok(None)
            }
            Lookup::Missing => {
                self.stats.on_miss(region);
                Ok(None)
            }
        }
    }

    fn remove(&self, key: &str, region: Option<&str>) -> Result<bool> {
        validate_address(key, region)?;
        let removed = self.store.remove_item(key, region)?;
        self.stats.on_remove(region, removed);
        Ok(removed)
    }

    fn clear(&self) -> Result<()> {
        self.store.clear()?;
        self.stats.on_clear();
        trace!(handle = %self.name(), "Cleared");
        Ok(())
    }

    fn clear_region(&self, region: &str) -> Result<()> {
        validate_region(region)?;
        self.store.clear_region(region)?;
        self.stats.on_clear_region(region);
        trace!(handle = %self.name(), region, "Cleared region");
        Ok(())
    }

    fn update(
        &self,
        key: &str,
        region: Option<&str>,
        update_value: &dyn Fn(&V) -> V,
        config: &UpdateItemConfig,
    ) -> Result<UpdateItemResult> {
        validate_address(key, region)?;
        let outcome = self.store.update_item(key, region, update_value, config)?;
        let result = outcome.result;
        if outcome.dropped_expired {
            trace!(handle = %self.name(), key, ?region, "Item expired");
            self.stats.on_expired(region);
        }

        self.stats.on_get(region);
        if result.is_not_found() {
            self.stats.on_miss(region);
        } else {
            self.stats.on_hit(region);
        }
        if result.updated {
            self.stats.on_put(region, false);
        }
        Ok(result)
    }

    fn count(&self) -> usize {
        self.store.count()
    }

    fn stats(&self) -> &CacheStats {
        &self.stats
    }

    fn dispose(&self) {
        self.store.dispose();
    }
}

impl<V, S> std::fmt::Debug for BaseCacheHandle<V, S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BaseCacheHandle")
            .field("name", &self.configuration.handle_name)
            .field("type", &self.configuration.handle_type)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handle::DictionaryStore;
    use crate::stats::CacheStatsCounterType::*;
    use std::time::Duration;
    use tiercache_core::DICTIONARY_HANDLE_TYPE;

    fn handle(
        configure: impl FnOnce(&mut CacheHandleConfiguration),
    ) -> BaseCacheHandle<i32, DictionaryStore<i32>> {
        let mut configuration = CacheHandleConfiguration::new(DICTIONARY_HANDLE_TYPE, "memory");
        configure(&mut configuration);
        BaseCacheHandle::new(configuration, DictionaryStore::new())
    }

    #[test]
    fn test_add_only_counts_stored_items() {
        let handle = handle(|_| {});
        assert!(handle.add(CacheItem::new("key", 1).unwrap()).unwrap());
        assert!(!handle.add(CacheItem::new("key", 2).unwrap()).unwrap());

        assert_eq!(handle.stats().get_statistic(AddCalls), 1);
        assert_eq!(handle.stats().get_statistic(Items), 1);
        assert_eq!(*handle.get("key", None).unwrap().unwrap().value(), 1);
    }

    #[test]
    fn test_get_counts_hits_and_misses() {
        let handle = handle(|_| {});
        handle.put(CacheItem::in_region("key", "region", 1).unwrap()).unwrap();

        assert!(handle.get("key", Some("region")).unwrap().is_some());
        assert!(handle.get("key", None).unwrap().is_none());

        let stats = handle.stats();
        assert_eq!(stats.get_statistic(GetCalls), 2);
        assert_eq!(stats.get_statistic(Hits), 1);
        assert_eq!(stats.get_statistic(Misses), 1);
        assert_eq!(stats.get_region_statistic("region", Hits), 1);
        assert_eq!(stats.get_region_statistic("region", Misses), 0);
    }

    #[test]
    fn test_invalid_arguments_rejected() {
        let handle = handle(|_| {});
        assert!(handle.get("", None).unwrap_err().is_invalid_argument());
        assert!(handle.get("key", Some(" ")).unwrap_err().is_invalid_argument());
        assert!(handle.remove(" ", None).unwrap_err().is_invalid_argument());
        assert!(handle.clear_region("").unwrap_err().is_invalid_argument());
        assert_eq!(handle.stats().get_statistic(GetCalls), 0);
    }

    #[test]
    fn test_update_statistics() {
        let handle = handle(|_| {});
        handle.add(CacheItem::new("key", 1).unwrap()).unwrap();

        let config = UpdateItemConfig::default();
        let result = handle.update("key", None, &|v| v + 1, &config).unwrap();
        assert!(result.updated);
        let missing = handle.update("other", None, &|v| v + 1, &config).unwrap();
        assert!(missing.is_not_found());

        let stats = handle.stats();
        assert_eq!(stats.get_statistic(GetCalls), 2);
        assert_eq!(stats.get_statistic(Hits), 1);
        assert_eq!(stats.get_statistic(Misses), 1);
        assert_eq!(stats.get_statistic(PutCalls), 1);
        assert_eq!(stats.get_statistic(Items), 1);
    }

    #[test]
    fn test_default_expiration_applied() {
        let handle = handle(|c| {
            c.expiration_mode = ExpirationMode::Absolute;
            c.expiration_timeout = Duration::from_millis(20);
        });
        handle.add(CacheItem::new("key", 1).unwrap()).unwrap();
        let item = handle.get("key", None).unwrap().unwrap();
        assert_eq!(item.expiration_mode(), ExpirationMode::Absolute);

        std::thread::sleep(Duration::from_millis(50));
        assert!(handle.get("key", None).unwrap().is_none());
        assert_eq!(handle.stats().get_statistic(Items), 0);
        assert_eq!(handle.count(), 0);
    }

    #[test]
    fn test_item_expiration_wins_over_default() {
        let handle = handle(|c| {
            c.expiration_mode = ExpirationMode::Absolute;
            c.expiration_timeout = Duration::from_secs(60);
        });
        let item = CacheItem::with_expiration(
            "key",
            None,
            1,
            ExpirationMode::Sliding,
            Duration::from_secs(5),
        )
        .unwrap();
        handle.put(item).unwrap();

        let stored = handle.get("key", None).unwrap().unwrap();
        assert_eq!(stored.expiration_mode(), ExpirationMode::Sliding);
        assert_eq!(stored.expiration_timeout(), Duration::from_secs(5));
    }

    fn expiring(timeout_ms: u64) -> BaseCacheHandle<i32, DictionaryStore<i32>> {
        handle(|c| {
            c.expiration_mode = ExpirationMode::Absolute;
            c.expiration_timeout = Duration::from_millis(timeout_ms);
        })
    }

    #[test]
    fn test_add_over_expired_item_keeps_item_count() {
        let handle = expiring(20);
        handle.add(CacheItem::new("key", 1).unwrap()).unwrap();
        std::thread::sleep(Duration::from_millis(50));

        assert!(handle.add(CacheItem::new("key", 2).unwrap()).unwrap());
        assert_eq!(handle.stats().get_statistic(AddCalls), 2);
        assert_eq!(handle.stats().get_statistic(Items), 1);
        assert_eq!(handle.count(), 1);
    }

    #[test]
    fn test_update_of_expired_item_drops_it_from_count() {
        let handle = expiring(20);
        handle.add(CacheItem::in_region("key", "region", 1).unwrap()).unwrap();
        std::thread::sleep(Duration::from_millis(50));

        let config = UpdateItemConfig::default();
        let result = handle.update("key", Some("region"), &|v| v + 1, &config).unwrap();
        assert!(result.is_not_found());

        let stats = handle.stats();
        assert_eq!(stats.get_statistic(Misses), 1);
        assert_eq!(stats.get_statistic(Items), 0);
        assert_eq!(stats.get_region_statistic("region", Items), 0);
        assert_eq!(handle.count(), 0);
    }

    #[test]
    fn test_remove_of_expired_item() {
        let handle = expiring(20);
        handle.add(CacheItem::new("key", 1).unwrap()).unwrap();
        std::thread::sleep(Duration::from_millis(50));

        assert!(!handle.remove("key", None).unwrap());
        assert!(handle.get("key", None).unwrap().is_none());
        assert_eq!(handle.stats().get_statistic(RemoveCalls), 1);
        assert_eq!(handle.stats().get_statistic(Items), 0);
        assert_eq!(handle.count(), 0);
    }

    #[test]
    fn test_propagated_add_always_counts_the_call() {
        let handle = handle(|_| {});
        handle.put(CacheItem::new("key", 1).unwrap()).unwrap();

        assert!(!handle.propagate_add(CacheItem::new("key", 2).unwrap()).unwrap());
        assert!(handle.propagate_add(CacheItem::new("other", 3).unwrap()).unwrap());

        let stats = handle.stats();
        assert_eq!(stats.get_statistic(AddCalls), 2);
        assert_eq!(stats.get_statistic(Items), 2);
        // The newer put is kept
        assert_eq!(*handle.get("key", None).unwrap().unwrap().value(), 1);
    }

    #[test]
    fn test_disabled_statistics() {
        let handle = handle(|c| c.enable_statistics = false);
        handle.add(CacheItem::new("key", 1).unwrap()).unwrap();
        handle.get("key", None).unwrap();
        assert_eq!(handle.stats().get_statistic(AddCalls), 0);
        assert_eq!(handle.stats().get_statistic(Hits), 0);
        assert_eq!(handle.count(), 1);
    }
}
