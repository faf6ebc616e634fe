//! Per-handle statistics tracking and reporting

use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicI64, Ordering};

/// Counters kept for every handle, and for every region within a handle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CacheStatsCounterType {
    AddCalls,
    GetCalls,
    PutCalls,
    RemoveCalls,
    ClearCalls,
    ClearRegionCalls,
    Hits,
    Misses,
    Items,
}

impl CacheStatsCounterType {
    pub const ALL: [CacheStatsCounterType; 9] = [
        CacheStatsCounterType::AddCalls,
        CacheStatsCounterType::GetCalls,
        CacheStatsCounterType::PutCalls,
        CacheStatsCounterType::RemoveCalls,
        CacheStatsCounterType::ClearCalls,
        CacheStatsCounterType::ClearRegionCalls,
        CacheStatsCounterType::Hits,
        CacheStatsCounterType::Misses,
        CacheStatsCounterType::Items,
    ];

    fn index(self) -> usize {
        self as usize
    }
}

#[derive(Debug, Default)]
struct Counters {
    values: [AtomicI64; 9],
}

impl Counters {
    fn increment(&self, counter: CacheStatsCounterType) {
        self.add(counter, 1);
    }

    fn add(&self, counter: CacheStatsCounterType, delta: i64) {
        self.values[counter.index()].fetch_add(delta, Ordering::Relaxed);
    }

    fn set(&self, counter: CacheStatsCounterType, value: i64) {
        self.values[counter.index()].store(value, Ordering::Relaxed);
    }

    fn get(&self, counter: CacheStatsCounterType) -> i64 {
        self.values[counter.index()].load(Ordering::Relaxed)
    }
}

/// Atomic counters of one cache handle.
///
/// Every counter is kept twice: once for the whole handle and once for the
/// region the operation addressed (if any). When statistics are disabled all
/// recording methods are no-ops and every counter reads 0.
#[derive(Debug)]
pub struct CacheStats {
    handle_name: String,
    enabled: bool,
    totals: Counters,
    regions: DashMap<String, Counters>,
}

impl CacheStats {
    pub fn new(handle_name: impl Into<String>, enabled: bool) -> Self {
        Self {
            handle_name: handle_name.into(),
            enabled,
            totals: Counters::default(),
            regions: DashMap::new(),
        }
    }

    pub fn handle_name(&self) -> &str {
        &self.handle_name
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Current value of a counter for the whole handle
    pub fn get_statistic(&self, counter: CacheStatsCounterType) -> i64 {
        self.totals.get(counter)
    }

    /// Current value of a counter restricted to one region
    pub fn get_region_statistic(&self, region: &str, counter: CacheStatsCounterType) -> i64 {
        self.regions
            .get(region)
            .map(|counters| counters.get(counter))
            .unwrap_or(0)
    }

    fn record(&self, region: Option<&str>, counter: CacheStatsCounterType, delta: i64) {
        if !self.enabled {
            return;
        }
        self.totals.add(counter, delta);
        if let Some(region) = region {
            self.regions
                .entry(region.to_string())
                .or_default()
                .add(counter, delta);
        }
    }

    /// An add was counted; `stored` tells whether it stored a new item
    pub fn on_add(&self, region: Option<&str>, stored: bool) {
        self.record(region, CacheStatsCounterType::AddCalls, 1);
        if stored {
            self.record(region, CacheStatsCounterType::Items, 1);
        }
    }

    /// A get was issued; follow with [`on_hit`](Self::on_hit) or [`on_miss`](Self::on_miss)
    pub fn on_get(&self, region: Option<&str>) {
        self.record(region, CacheStatsCounterType::GetCalls, 1);
    }

    pub fn on_hit(&self, region: Option<&str>) {
        self.record(region, CacheStatsCounterType::Hits, 1);
    }

    pub fn on_miss(&self, region: Option<&str>) {
        self.record(region, CacheStatsCounterType::Misses, 1);
    }

    /// A put was issued; `created` tells whether the key was new
    pub fn on_put(&self, region: Option<&str>, created: bool) {
        self.record(region, CacheStatsCounterType::PutCalls, 1);
        if created {
            self.record(region, CacheStatsCounterType::Items, 1);
        }
    }

    /// A remove was issued; `removed` tells whether an item went away
    pub fn on_remove(&self, region: Option<&str>, removed: bool) {
        self.record(region, CacheStatsCounterType::RemoveCalls, 1);
        if removed {
            self.record(region, CacheStatsCounterType::Items, -1);
        }
    }

    /// An item was dropped by the store because it expired
    pub fn on_expired(&self, region: Option<&str>) {
        self.record(region, CacheStatsCounterType::Items, -1);
    }

    /// The whole handle was cleared
    pub fn on_clear(&self) {
        if !self.enabled {
            return;
        }
        self.totals.increment(CacheStatsCounterType::ClearCalls);
        self.totals.set(CacheStatsCounterType::Items, 0);
        for counters in self.regions.iter() {
            counters.set(CacheStatsCounterType::Items, 0);
        }
    }

    /// One region was cleared
    pub fn on_clear_region(&self, region: &str) {
        if !self.enabled {
            return;
        }
        self.totals.increment(CacheStatsCounterType::ClearRegionCalls);
        let counters = self.regions.entry(region.to_string()).or_default();
        counters.increment(CacheStatsCounterType::ClearRegionCalls);
        let region_items = counters.get(CacheStatsCounterType::Items);
        counters.set(CacheStatsCounterType::Items, 0);
        self.totals.add(CacheStatsCounterType::Items, -region_items);
    }

    /// Copy of the handle-wide counters
    pub fn snapshot(&self) -> CacheStatsSnapshot {
        CacheStatsSnapshot {
            handle_name: self.handle_name.clone(),
            add_calls: self.get_statistic(CacheStatsCounterType::AddCalls),
            get_calls: self.get_statistic(CacheStatsCounterType::GetCalls),
            put_calls: self.get_statistic(CacheStatsCounterType::PutCalls),
            remove_calls: self.get_statistic(CacheStatsCounterType::RemoveCalls),
            clear_calls: self.get_statistic(CacheStatsCounterType::ClearCalls),
            clear_region_calls: self.get_statistic(CacheStatsCounterType::ClearRegionCalls),
            hits: self.get_statistic(CacheStatsCounterType::Hits),
            misses: self.get_statistic(CacheStatsCounterType::Misses),
            items: self.get_statistic(CacheStatsCounterType::Items),
        }
    }
}

/// Point-in-time copy of a handle's counters
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheStatsSnapshot {
    pub handle_name: String,
    pub add_calls: i64,
    pub get_calls: i64,
    pub put_calls: i64,
    pub remove_calls: i64,
    pub clear_calls: i64,
    pub clear_region_calls: i64,
    pub hits: i64,
    pub misses: i64,
    pub items: i64,
}

impl CacheStatsSnapshot {
    /// Calculate hit rate as a percentage
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            (self.hits as f64 / total as f64) * 100.0
        }
    }
}
