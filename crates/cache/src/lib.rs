//! Multi-tier cache for tiercache
//!
//! A [`CacheManager`] coordinates an ordered list of cache handles, from the
//! fastest tier to the slowest:
//! - Reads fall through the tiers and promote hits into faster ones
//! - Writes go to every tier
//! - Updates are optimistic read-modify-writes with bounded retries
//! - Per-handle statistics and manager-level events
//! - Removes and clears propagate to peer managers over a backplane
//!
//! Types shared with backends (items, configuration, errors) live in
//! `tiercache-core` and are re-exported here.

pub mod backplane;
pub mod events;
pub mod handle;
pub mod manager;
pub mod stats;

pub use backplane::{
    Backplane, BackplaneAction, BackplaneHandler, BackplaneMessage, InMemoryBackplane,
    SubscriptionId,
};
pub use events::{EventCallback, EventHub, EventSubscriptionId};
pub use handle::{
    optimistic_update, BaseCacheHandle, CacheHandle, CacheStore, DictionaryCacheHandle,
    DictionaryStore, Insertion, Lookup, UpdateOutcome,
};
pub use manager::{CacheFactory, CacheManager, HandleConstructor, HandleList};
pub use stats::{CacheStats, CacheStatsCounterType, CacheStatsSnapshot};

pub use tiercache_core::{
    CacheEvent, CacheEventKind, CacheHandleConfiguration, CacheItem, CacheManagerConfiguration,
    ConfigurationBuilder, Error, ExpirationMode, Result, UpdateItemConfig, UpdateItemResult,
    UpdateMode,
};
