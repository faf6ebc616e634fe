//! Storage primitives a cache tier is built on

use super::update::optimistic_update;
use std::sync::Arc;
use tiercache_core::{CacheItem, Result, UpdateItemConfig, UpdateItemResult};

/// Result of looking an item up in a store
#[derive(Debug)]
pub enum Lookup<V> {
    /// The live item, shared with the store so it can be compared by identity
    Found(Arc<CacheItem<V>>),
    /// Nothing stored under the key
    Missing,
    /// An item was stored but had expired; the store dropped it
    Expired,
}

impl<V> Lookup<V> {
    pub fn into_item(self) -> Option<Arc<CacheItem<V>>> {
        match self {
            Lookup::Found(item) => Some(item),
            Lookup::Missing | Lookup::Expired => None,
        }
    }

    pub fn is_found(&self) -> bool {
        matches!(self, Lookup::Found(_))
    }
}

/// Result of adding an item to a store
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Insertion {
    /// The key was free
    Added,
    /// The key held an expired item, which the new one replaced
    ReplacedExpired,
    /// A live item holds the key; nothing was stored
    Exists,
}

impl Insertion {
    pub fn is_stored(self) -> bool {
        !matches!(self, Insertion::Exists)
    }
}

/// Result of a store-level update
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UpdateOutcome {
    pub result: UpdateItemResult,
    /// An expired item was dropped while the key was looked up
    pub dropped_expired: bool,
}

impl From<UpdateItemResult> for UpdateOutcome {
    fn from(result: UpdateItemResult) -> Self {
        Self {
            result,
            dropped_expired: false,
        }
    }
}

/// Raw operations of one backing store.
///
/// Implementations must be internally synchronized: `add_item` is a
/// test-and-set and `replace_item` a linearizable compare-and-replace against
/// the exact instance returned by `get_item`. Keys and regions arrive
/// validated. Statistics and expiration defaults are applied by
/// [`BaseCacheHandle`](super::BaseCacheHandle), not here.
pub trait CacheStore<V>: Send + Sync {
    /// Store `item` unless a live item holds its key
    fn add_item(&self, item: CacheItem<V>) -> Result<Insertion>;

    /// Store `item` unconditionally; returns whether the key was new
    fn put_item(&self, item: CacheItem<V>) -> Result<bool>;

    fn get_item(&self, key: &str, region: Option<&str>) -> Result<Lookup<V>>;

    /// Returns whether a live item was removed
    fn remove_item(&self, key: &str, region: Option<&str>) -> Result<bool>;

    fn clear(&self) -> Result<()>;

    fn clear_region(&self, region: &str) -> Result<()>;

    /// Swap `current` for `replacement` if `current` is still the stored instance
    fn replace_item(
        &self,
        current: &Arc<CacheItem<V>>,
        replacement: CacheItem<V>,
    ) -> Result<bool>;

    fn count(&self) -> usize;

    /// Read-modify-write under optimistic concurrency. Stores with a native
    /// atomic update primitive override this.
    fn update_item(
        &self,
        key: &str,
        region: Option<&str>,
        update_value: &dyn Fn(&V) -> V,
        config: &UpdateItemConfig,
    ) -> Result<UpdateOutcome> {
        optimistic_update(self, key, region, update_value, config)
    }

    /// Release connections and other resources held by the store
    fn dispose(&self) {}
}

/// A shared store, e.g. one distributed tier used by several managers
impl<V, S> CacheStore<V> for Arc<S>
where
    S: CacheStore<V> + ?Sized,
{
    fn add_item(&self, item: CacheItem<V>) -> Result<Insertion> {
        (**self).add_item(item)
    }

    fn put_item(&self, item: CacheItem<V>) -> Result<bool> {
        (**self).put_item(item)
    }

    fn get_item(&self, key: &str, region: Option<&str>) -> Result<Lookup<V>> {
        (**self).get_item(key, region)
    }

    fn remove_item(&self, key: &str, region: Option<&str>) -> Result<bool> {
        (**self).remove_item(key, region)
    }

    fn clear(&self) -> Result<()> {
        (**self).clear()
    }

    fn clear_region(&self, region: &str) -> Result<()> {
        (**self).clear_region(region)
    }

    fn replace_item(
        &self,
        current: &Arc<CacheItem<V>>,
        replacement: CacheItem<V>,
    ) -> Result<bool> {
        (**self).replace_item(current, replacement)
    }

    fn count(&self) -> usize {
        (**self).count()
    }

    fn update_item(
        &self,
        key: &str,
        region: Option<&str>,
        update_value: &dyn Fn(&V) -> V,
        config: &UpdateItemConfig,
    ) -> Result<UpdateOutcome> {
        (**self).update_item(key, region, update_value, config)
    }

    // A shared store outlives the managers using it, so disposal is left to its owner
}
