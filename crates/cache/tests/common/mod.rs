//! Common test utilities and helpers
#![allow(dead_code)]

use std::sync::{Arc, Once};
use std::time::Duration;
use tiercache::{
    CacheFactory, CacheHandle, CacheManager, CacheStatsCounterType, ConfigurationBuilder,
    UpdateMode,
};
use tracing_subscriber::EnvFilter;

/// Route `tracing` output to the test harness; filter with `RUST_LOG`
pub fn init_tracing() {
    static INIT: Once = Once::new();
    INIT.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    });
}

/// Builder for managers made of dictionary handles named `h0`, `h1`, ...
pub struct TestManagerBuilder {
    handles: usize,
    update_mode: UpdateMode,
    retry_timeout: Duration,
}

impl TestManagerBuilder {
    pub fn new(handles: usize) -> Self {
        Self {
            handles,
            update_mode: UpdateMode::Up,
            retry_timeout: Duration::from_millis(1),
        }
    }

    pub fn with_update_mode(mut self, update_mode: UpdateMode) -> Self {
        self.update_mode = update_mode;
        self
    }

    pub fn build<V>(self) -> CacheManager<V>
    where
        V: Clone + Send + Sync + 'static,
    {
        init_tracing();
        let mut builder = ConfigurationBuilder::new("test")
            .with_update_mode(self.update_mode)
            .with_retry_timeout(self.retry_timeout);
        for index in 0..self.handles {
            builder = builder.with_dictionary_handle(&format!("h{index}"));
        }
        let configuration = builder.build().expect("valid test configuration");
        CacheFactory::new()
            .build(configuration, None)
            .expect("manager over dictionary handles")
    }
}

/// The counter's value on every handle, in tier order
pub fn statistic<V>(manager: &CacheManager<V>, counter: CacheStatsCounterType) -> Vec<i64> {
    manager
        .handles()
        .iter()
        .map(|h| h.stats().get_statistic(counter))
        .collect()
}

/// Item counts of every handle, in tier order
pub fn counts<V>(manager: &CacheManager<V>) -> Vec<usize> {
    manager.handles().iter().map(|h| h.count()).collect()
}

pub fn handle<V>(manager: &CacheManager<V>, index: usize) -> &Arc<dyn CacheHandle<V>> {
    &manager.handles()[index]
}
