//! Multi-tier cache manager

mod factory;
mod operations;

pub use factory::{CacheFactory, HandleConstructor};

use crate::backplane::{Backplane, BackplaneAction, BackplaneMessage, SubscriptionId};
use crate::events::EventHub;
use crate::handle::CacheHandle;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tiercache_core::{CacheManagerConfiguration, Error, Result};
use tracing::{debug, warn};
use uuid::Uuid;

/// Shared, ordered list of tiers
pub type HandleList<V> = Arc<[Arc<dyn CacheHandle<V>>]>;

/// Coordinates an ordered list of cache handles, index 0 being the fastest.
///
/// Reads fall through the tiers and promote hits according to the configured
/// [`UpdateMode`](tiercache_core::UpdateMode); writes go to every tier.
/// Removes and clears are published on the backplane, if one is attached, so
/// peer managers invalidate their source handles.
pub struct CacheManager<V> {
    configuration: CacheManagerConfiguration,
    handles: HandleList<V>,
    events: Arc<EventHub>,
    backplane: Option<Arc<dyn Backplane>>,
    subscription: Mutex<Option<SubscriptionId>>,
    instance_id: Uuid,
    disposed: AtomicBool,
}

impl<V> CacheManager<V>
where
    V: Clone + Send + Sync + 'static,
{
    /// Create a manager over already constructed handles.
    ///
    /// `handles` must match `configuration.handles` in count, name and
    /// order. A backplane must be supplied exactly when the configuration
    /// names one.
    pub fn new(
        configuration: CacheManagerConfiguration,
        handles: Vec<Arc<dyn CacheHandle<V>>>,
        backplane: Option<Arc<dyn Backplane>>,
    ) -> Result<Self> {
        configuration.validate()?;

        if handles.len() != configuration.handles.len() {
            return Err(Error::configuration(format!(
                "cache manager '{}' expects {} handles but {} were supplied",
                configuration.name,
                configuration.handles.len(),
                handles.len()
            )));
        }
        for (handle, expected) in handles.iter().zip(&configuration.handles) {
            if !handle.name().eq_ignore_ascii_case(&expected.handle_name) {
                return Err(Error::configuration(format!(
                    "cache handle '{}' supplied where '{}' is configured",
                    handle.name(),
                    expected.handle_name
                )));
            }
        }

        match (&configuration.backplane, &backplane) {
            (Some(expected), Some(actual))
                if !actual.name().eq_ignore_ascii_case(&expected.name) =>
            {
                return Err(Error::configuration(format!(
                    "backplane '{}' supplied where '{}' is configured",
                    actual.name(),
                    expected.name
                )));
            }
            (Some(expected), None) => {
                return Err(Error::configuration(format!(
                    "backplane '{}' is configured but none was supplied",
                    expected.name
                )));
            }
            (None, Some(actual)) => {
                return Err(Error::configuration(format!(
                    "backplane '{}' supplied but cache manager '{}' has no backplane configured",
                    actual.name(),
                    configuration.name
                )));
            }
            _ => {}
        }

        let handles: HandleList<V> = handles.into();
        let instance_id = Uuid::new_v4();

        let subscription = match &backplane {
            Some(backplane) => {
                let receiving = Arc::clone(&handles);
                let id = backplane.subscribe(Arc::new(move |message: &BackplaneMessage| {
                    if message.origin != instance_id {
                        apply_invalidation(&receiving, message);
                    }
                }))?;
                Some(id)
            }
            None => None,
        };

        debug!(
            manager = %configuration.name,
            %instance_id,
            handles = handles.len(),
            update_mode = %configuration.update_mode,
            backplane = backplane.as_ref().map(|b| b.name()),
            "Cache manager created"
        );

        Ok(Self {
            configuration,
            handles,
            events: Arc::new(EventHub::new()),
            backplane,
            subscription: Mutex::new(subscription),
            instance_id,
            disposed: AtomicBool::new(false),
        })
    }

    pub(crate) fn publish_invalidation(&self, action: BackplaneAction) -> Result<()> {
        if let Some(backplane) = &self.backplane {
            backplane.publish(&BackplaneMessage::new(self.instance_id, action))?;
        }
        Ok(())
    }
}

impl<V> CacheManager<V> {
    pub fn name(&self) -> &str {
        &self.configuration.name
    }

    pub fn configuration(&self) -> &CacheManagerConfiguration {
        &self.configuration
    }

    /// Tiers in priority order
    pub fn handles(&self) -> &[Arc<dyn CacheHandle<V>>] {
        &self.handles
    }

    /// Look up a handle by name, ignoring case
    pub fn handle(&self, name: &str) -> Option<&Arc<dyn CacheHandle<V>>> {
        self.handles
            .iter()
            .find(|h| h.name().eq_ignore_ascii_case(name))
    }

    /// Event registry of this manager
    pub fn events(&self) -> &EventHub {
        &self.events
    }

    /// Identifies this manager on the backplane
    pub fn instance_id(&self) -> Uuid {
        self.instance_id
    }

    pub fn backplane(&self) -> Option<&Arc<dyn Backplane>> {
        self.backplane.as_ref()
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed.load(Ordering::Acquire)
    }

    /// Leave the backplane and dispose every handle. Safe to call repeatedly;
    /// also runs on drop.
    pub fn dispose(&self) {
        if self.disposed.swap(true, Ordering::AcqRel) {
            return;
        }

        if let (Some(backplane), Some(id)) = (&self.backplane, self.subscription.lock().take()) {
            if let Err(e) = backplane.unsubscribe(id) {
                warn!(manager = %self.configuration.name, error = %e, "Failed to leave backplane");
            }
        }
        for handle in self.handles.iter() {
            handle.dispose();
        }
        debug!(manager = %self.configuration.name, "Cache manager disposed");
    }
}

impl<V> Drop for CacheManager<V> {
    fn drop(&mut self) {
        self.dispose();
    }
}

impl<V> std::fmt::Debug for CacheManager<V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CacheManager")
            .field("name", &self.configuration.name)
            .field("instance_id", &self.instance_id)
            .field(
                "handles",
                &self.handles.iter().map(|h| h.name()).collect::<Vec<_>>(),
            )
            .field("update_mode", &self.configuration.update_mode)
            .finish()
    }
}

/// Replay a peer's invalidation on the handles flagged as backplane source
fn apply_invalidation<V>(handles: &[Arc<dyn CacheHandle<V>>], message: &BackplaneMessage) {
    for handle in handles.iter().filter(|h| h.is_backplane_source()) {
        let outcome = match &message.action {
            BackplaneAction::Removed { key, region } => {
                handle.remove(key, region.as_deref()).map(|_| ())
            }
            BackplaneAction::Cleared => handle.clear(),
            BackplaneAction::ClearedRegion { region } => handle.clear_region(region),
        };
        match outcome {
            Ok(()) => debug!(
                handle = %handle.name(),
                origin = %message.origin,
                action = ?message.action,
                "Applied backplane invalidation"
            ),
            Err(e) => warn!(
                handle = %handle.name(),
                origin = %message.origin,
                error = %e,
                "Failed to apply backplane invalidation"
            ),
        }
    }
}
