//! Cache handles: one tier of a cache manager
//!
//! A handle is the unit the manager coordinates. [`BaseCacheHandle`] turns
//! any [`CacheStore`] into a handle by adding argument validation, statistics
//! and the handle's default expiration; stores only implement the raw
//! primitives.

mod base;
mod dictionary;
mod store;
mod update;

pub use base::BaseCacheHandle;
pub use dictionary::{DictionaryCacheHandle, DictionaryStore};
pub use store::{CacheStore, Insertion, Lookup, UpdateOutcome};
pub use update::optimistic_update;

use crate::stats::CacheStats;
use tiercache_core::{
    CacheHandleConfiguration, CacheItem, Result, UpdateItemConfig, UpdateItemResult,
};

/// One tier of a multi-tier cache
pub trait CacheHandle<V>: Send + Sync {
    /// Name of the handle, unique within its manager
    fn name(&self) -> &str;

    fn configuration(&self) -> &CacheHandleConfiguration;

    /// Store `item` only if its key is not taken. Returns whether it was stored.
    fn add(&self, item: CacheItem<V>) -> Result<bool>;

    /// Carry an add the manager's first tier already accepted down to this
    /// tier. A live item under the key is kept, since it can only come from a
    /// later write. The call counts as an add either way.
    fn propagate_add(&self, item: CacheItem<V>) -> Result<bool>;

    /// Store `item`, overwriting any existing value
    fn put(&self, item: CacheItem<V>) -> Result<()>;

    /// Look up an item; expired items are reported as absent
    fn get(&self, key: &str, region: Option<&str>) -> Result<Option<CacheItem<V>>>;

    /// Returns whether an item was removed
    fn remove(&self, key: &str, region: Option<&str>) -> Result<bool>;

    fn clear(&self) -> Result<()>;

    fn clear_region(&self, region: &str) -> Result<()>;

    /// Read-modify-write the value under `key`, retrying on version conflicts
    /// according to `config`
    fn update(
        &self,
        key: &str,
        region: Option<&str>,
        update_value: &dyn Fn(&V) -> V,
        config: &UpdateItemConfig,
    ) -> Result<UpdateItemResult>;

    /// Number of items currently held by the backing store
    fn count(&self) -> usize;

    fn stats(&self) -> &CacheStats;

    /// Whether invalidations from other manager instances apply to this handle
    fn is_backplane_source(&self) -> bool {
        self.configuration().is_backplane_source
    }

    /// Release the backing store
    fn dispose(&self);
}
