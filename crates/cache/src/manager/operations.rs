//! Cache operations: get, add, put, remove, clear and update across tiers

use super::CacheManager;
use crate::backplane::BackplaneAction;
use tiercache_core::{
    validate_address, validate_region, CacheEvent, CacheItem, Result, UpdateItemConfig,
    UpdateItemResult, UpdateMode,
};
use tracing::{debug, trace};

impl<V> CacheManager<V>
where
    V: Clone + Send + Sync + 'static,
{
    /// Get the value stored under `key`
    pub fn get(&self, key: &str) -> Result<Option<V>> {
        Ok(self.get_cache_item(key, None)?.map(CacheItem::into_value))
    }

    /// Get the value stored under `key` in `region`
    pub fn get_in_region(&self, key: &str, region: &str) -> Result<Option<V>> {
        Ok(self
            .get_cache_item(key, Some(region))?
            .map(CacheItem::into_value))
    }

    /// Look the item up tier by tier and promote a hit below the first tier
    pub fn get_cache_item(
        &self,
        key: &str,
        region: Option<&str>,
    ) -> Result<Option<CacheItem<V>>> {
        validate_address(key, region)?;

        for (index, handle) in self.handles.iter().enumerate() {
            let Some(item) = handle.get(key, region)? else {
                continue;
            };

            trace!(key, ?region, handle = %handle.name(), tier = index, "Cache hit");
            self.promote(&item, index)?;
            self.events.publish(CacheEvent::Got {
                key: key.to_owned(),
                region: region.map(str::to_owned),
            });
            return Ok(Some(item));
        }

        trace!(key, ?region, "Cache miss on every tier");
        Ok(None)
    }

    fn promote(&self, item: &CacheItem<V>, found_at: usize) -> Result<()> {
        let targets: Vec<usize> = match self.configuration.update_mode {
            UpdateMode::None => return Ok(()),
            UpdateMode::Up => (0..found_at).collect(),
            UpdateMode::All => (0..self.handles.len()).filter(|&i| i != found_at).collect(),
        };

        for index in targets {
            let handle = &self.handles[index];
            if handle.add(item.clone())? {
                trace!(key = %item.key(), handle = %handle.name(), "Promoted item");
            }
        }
        Ok(())
    }

    /// Add `value` under `key` if the first tier does not hold it yet
    pub fn add(&self, key: &str, value: V) -> Result<bool> {
        self.add_item(CacheItem::new(key, value)?)
    }

    pub fn add_in_region(&self, key: &str, region: &str, value: V) -> Result<bool> {
        self.add_item(CacheItem::in_region(key, region, value)?)
    }

    /// Add `item` to every tier. The first tier decides: if it already holds
    /// the key nothing else is touched and the result is `false`.
    pub fn add_item(&self, item: CacheItem<V>) -> Result<bool> {
        let Some((first, rest)) = self.handles.split_first() else {
            return Ok(false);
        };

        if !first.add(item.clone())? {
            trace!(key = %item.key(), region = ?item.region(), "Add rejected, key exists");
            return Ok(false);
        }

        for handle in rest {
            if !handle.propagate_add(item.clone())? {
                debug!(
                    key = %item.key(),
                    region = ?item.region(),
                    handle = %handle.name(),
                    "Key already written to lower tier"
                );
            }
        }

        self.events.publish(CacheEvent::Added {
            key: item.key().to_owned(),
            region: item.region().map(str::to_owned),
        });
        Ok(true)
    }

    /// Store `value` under `key` in every tier
    pub fn put(&self, key: &str, value: V) -> Result<()> {
        self.put_item(CacheItem::new(key, value)?)
    }

    pub fn put_in_region(&self, key: &str, region: &str, value: V) -> Result<()> {
        self.put_item(CacheItem::in_region(key, region, value)?)
    }

    pub fn put_item(&self, item: CacheItem<V>) -> Result<()> {
        for handle in self.handles.iter() {
            handle.put(item.clone())?;
        }

        self.events.publish(CacheEvent::Put {
            key: item.key().to_owned(),
            region: item.region().map(str::to_owned),
        });
        Ok(())
    }

    /// Remove `key` from every tier; returns whether any tier held it
    pub fn remove(&self, key: &str) -> Result<bool> {
        self.remove_item(key, None)
    }

    pub fn remove_in_region(&self, key: &str, region: &str) -> Result<bool> {
        self.remove_item(key, Some(region))
    }

    fn remove_item(&self, key: &str, region: Option<&str>) -> Result<bool> {
        validate_address(key, region)?;

        let mut removed = false;
        for handle in self.handles.iter() {
            if handle.remove(key, region)? {
                removed = true;
            }
        }

        if removed {
            self.publish_invalidation(BackplaneAction::Removed {
                key: key.to_owned(),
                region: region.map(str::to_owned),
            })?;
            self.events.publish(CacheEvent::Removed {
                key: key.to_owned(),
                region: region.map(str::to_owned),
            });
        }
        Ok(removed)
    }

    /// Clear every tier
    pub fn clear(&self) -> Result<()> {
        for handle in self.handles.iter() {
            handle.clear()?;
        }

        self.publish_invalidation(BackplaneAction::Cleared)?;
        self.events.publish(CacheEvent::Cleared);
        debug!(manager = %self.name(), "Cache cleared");
        Ok(())
    }

    /// Clear one region in every tier
    pub fn clear_region(&self, region: &str) -> Result<()> {
        validate_region(region)?;

        for handle in self.handles.iter() {
            handle.clear_region(region)?;
        }

        self.publish_invalidation(BackplaneAction::ClearedRegion {
            region: region.to_owned(),
        })?;
        self.events.publish(CacheEvent::ClearedRegion {
            region: region.to_owned(),
        });
        debug!(manager = %self.name(), region, "Cache region cleared");
        Ok(())
    }

    /// Update the value under `key` with the configured retry policy
    pub fn update<F>(&self, key: &str, update_value: F) -> Result<UpdateItemResult>
    where
        F: Fn(&V) -> V,
    {
        let config = self.configuration.update_item_config();
        self.update_with_config(key, None, update_value, &config)
    }

    pub fn update_in_region<F>(
        &self,
        key: &str,
        region: &str,
        update_value: F,
    ) -> Result<UpdateItemResult>
    where
        F: Fn(&V) -> V,
    {
        let config = self.configuration.update_item_config();
        self.update_with_config(key, Some(region), update_value, &config)
    }

    /// Update the value under `key` in every tier that holds it.
    ///
    /// The combined result is `updated` only if every participating tier
    /// wrote the value, reports a conflict if any tier hit one and carries
    /// the highest retry count. Tiers without the key are skipped and not
    /// backfilled.
    pub fn update_with_config<F>(
        &self,
        key: &str,
        region: Option<&str>,
        update_value: F,
        config: &UpdateItemConfig,
    ) -> Result<UpdateItemResult>
    where
        F: Fn(&V) -> V,
    {
        validate_address(key, region)?;

        let mut participated = false;
        let mut updated = true;
        let mut conflict = false;
        let mut retries = 0;

        for handle in self.handles.iter() {
            let outcome = handle.update(key, region, &update_value, config)?;
            if outcome.is_not_found() {
                continue;
            }

            participated = true;
            updated &= outcome.updated;
            conflict |= outcome.version_conflict_occurred;
            retries = retries.max(outcome.retries);

            if !outcome.updated {
                debug!(
                    key,
                    ?region,
                    handle = %handle.name(),
                    retries = outcome.retries,
                    "Update gave up after version conflicts"
                );
            }
        }

        let result = UpdateItemResult::new(conflict, participated && updated, retries);
        self.events.publish(CacheEvent::Updated {
            key: key.to_owned(),
            region: region.map(str::to_owned),
            config: *config,
            result,
        });
        Ok(result)
    }
}
