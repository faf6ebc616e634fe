//! Cache-related events

use crate::update::{UpdateItemConfig, UpdateItemResult};
use serde::{Deserialize, Serialize};

/// Events raised by a cache manager, one per manager-level call
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum CacheEvent {
    /// An add stored a new item
    Added { key: String, region: Option<String> },
    /// A get found a value in one of the tiers
    Got { key: String, region: Option<String> },
    /// A put stored an item in every tier
    Put { key: String, region: Option<String> },
    /// A remove deleted the item from at least one tier
    Removed { key: String, region: Option<String> },
    /// An update ran against the tiers holding the key
    Updated {
        key: String,
        region: Option<String>,
        config: UpdateItemConfig,
        result: UpdateItemResult,
    },
    /// All tiers were cleared
    Cleared,
    /// One region was cleared in all tiers
    ClearedRegion { region: String },
}

/// Discriminant of [`CacheEvent`], used to subscribe to one kind only
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CacheEventKind {
    Added,
    Got,
    Put,
    Removed,
    Updated,
    Cleared,
    ClearedRegion,
}

impl CacheEvent {
    pub fn kind(&self) -> CacheEventKind {
        match self {
            CacheEvent::Added { .. } => CacheEventKind::Added,
            CacheEvent::Got { .. } => CacheEventKind::Got,
            CacheEvent::Put { .. } => CacheEventKind::Put,
            CacheEvent::Removed { .. } => CacheEventKind::Removed,
            CacheEvent::Updated { .. } => CacheEventKind::Updated,
            CacheEvent::Cleared => CacheEventKind::Cleared,
            CacheEvent::ClearedRegion { .. } => CacheEventKind::ClearedRegion,
        }
    }

    /// Key the event refers to, if it is about a single item
    pub fn key(&self) -> Option<&str> {
        match self {
            CacheEvent::Added { key, .. }
            | CacheEvent::Got { key, .. }
            | CacheEvent::Put { key, .. }
            | CacheEvent::Removed { key, .. }
            | CacheEvent::Updated { key, .. } => Some(key),
            CacheEvent::Cleared | CacheEvent::ClearedRegion { .. } => None,
        }
    }

    /// Region the event refers to
    pub fn region(&self) -> Option<&str> {
        match self {
            CacheEvent::Added { region, .. }
            | CacheEvent::Got { region, .. }
            | CacheEvent::Put { region, .. }
            | CacheEvent::Removed { region, .. }
            | CacheEvent::Updated { region, .. } => region.as_deref(),
            CacheEvent::ClearedRegion { region } => Some(region),
            CacheEvent::Cleared => None,
        }
    }
}
