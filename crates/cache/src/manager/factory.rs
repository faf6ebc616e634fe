//! Build managers from configuration

use super::CacheManager;
use crate::backplane::Backplane;
use crate::handle::{CacheHandle, DictionaryCacheHandle};
use std::collections::HashMap;
use std::sync::Arc;
use tiercache_core::{
    CacheHandleConfiguration, CacheManagerConfiguration, Error, Result, DICTIONARY_HANDLE_TYPE,
};
use tracing::{debug, warn};

/// Builds one handle from its configuration
pub type HandleConstructor<V> =
    Arc<dyn Fn(&CacheHandleConfiguration) -> Result<Arc<dyn CacheHandle<V>>> + Send + Sync>;

/// Registry of handle constructors keyed by `handle_type`.
///
/// The `"dictionary"` type is always available. Additional backends register
/// a constructor under their own type name.
pub struct CacheFactory<V> {
    constructors: HashMap<String, HandleConstructor<V>>,
}

impl<V> CacheFactory<V>
where
    V: Clone + Send + Sync + 'static,
{
    pub fn new() -> Self {
        let mut factory = Self {
            constructors: HashMap::new(),
        };
        factory.register(DICTIONARY_HANDLE_TYPE, |configuration| {
            let handle = DictionaryCacheHandle::<V>::dictionary(configuration.clone());
            Ok(Arc::new(handle) as Arc<dyn CacheHandle<V>>)
        });
        factory
    }

    /// Register (or replace) the constructor for `handle_type`. Type names
    /// are matched ignoring case.
    pub fn register<F>(&mut self, handle_type: &str, constructor: F)
    where
        F: Fn(&CacheHandleConfiguration) -> Result<Arc<dyn CacheHandle<V>>> + Send + Sync + 'static,
    {
        self.constructors
            .insert(handle_type.to_ascii_lowercase(), Arc::new(constructor));
    }

    pub fn is_registered(&self, handle_type: &str) -> bool {
        self.constructors
            .contains_key(&handle_type.to_ascii_lowercase())
    }

    /// Construct a single handle
    pub fn create_handle(
        &self,
        configuration: &CacheHandleConfiguration,
    ) -> Result<Arc<dyn CacheHandle<V>>> {
        let constructor = self
            .constructors
            .get(&configuration.handle_type.to_ascii_lowercase())
            .ok_or_else(|| {
                Error::configuration(format!(
                    "unknown cache handle type '{}' for handle '{}'",
                    configuration.handle_type, configuration.handle_name
                ))
            })?;
        constructor(configuration)
    }

    /// Construct every configured handle and the manager over them.
    ///
    /// If any step fails the handles built so far are disposed before the
    /// error is returned.
    pub fn build(
        &self,
        configuration: CacheManagerConfiguration,
        backplane: Option<Arc<dyn Backplane>>,
    ) -> Result<CacheManager<V>> {
        configuration.validate()?;

        let mut handles: Vec<Arc<dyn CacheHandle<V>>> =
            Vec::with_capacity(configuration.handles.len());
        for handle_configuration in &configuration.handles {
            match self.create_handle(handle_configuration) {
                Ok(handle) => handles.push(handle),
                Err(e) => {
                    warn!(
                        manager = %configuration.name,
                        handle = %handle_configuration.handle_name,
                        error = %e,
                        "Failed to create cache handle"
                    );
                    dispose_all(&handles);
                    return Err(e);
                }
            }
        }

        debug!(manager = %configuration.name, handles = handles.len(), "Cache handles created");
        CacheManager::new(configuration, handles.clone(), backplane).map_err(|e| {
            dispose_all(&handles);
            e
        })
    }
}

impl<V> Default for CacheFactory<V>
where
    V: Clone + Send + Sync + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

fn dispose_all<V>(handles: &[Arc<dyn CacheHandle<V>>]) {
    for handle in handles.iter().rev() {
        handle.dispose();
    }
}
