//! In-process backplane

use super::{Backplane, BackplaneHandler, BackplaneMessage, SubscriptionId};
use parking_lot::RwLock;
use std::sync::atomic::{AtomicU64, Ordering};
use tiercache_core::Result;
use tracing::{debug, trace};

/// Backplane connecting managers that live in the same process.
///
/// Share one instance (behind an `Arc`) between managers. Messages are
/// encoded to JSON and decoded for every subscriber, like they would be on a
/// network transport, and delivered synchronously on the publishing thread.
pub struct InMemoryBackplane {
    name: String,
    next_id: AtomicU64,
    subscribers: RwLock<Vec<(SubscriptionId, BackplaneHandler)>>,
    published: AtomicU64,
}

impl InMemoryBackplane {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            next_id: AtomicU64::new(1),
            subscribers: RwLock::new(Vec::new()),
            published: AtomicU64::new(0),
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.read().len()
    }

    /// Number of messages published so far
    pub fn published_count(&self) -> u64 {
        self.published.load(Ordering::Relaxed)
    }
}

impl Backplane for InMemoryBackplane {
    fn name(&self) -> &str {
        &self.name
    }

    fn publish(&self, message: &BackplaneMessage) -> Result<()> {
        let payload = message.to_json()?;
        self.published.fetch_add(1, Ordering::Relaxed);

        // Handlers may touch the subscriber list, so deliver from a copy
        let handlers: Vec<BackplaneHandler> = self
            .subscribers
            .read()
            .iter()
            .map(|(_, handler)| handler.clone())
            .collect();

        trace!(backplane = %self.name, %payload, subscribers = handlers.len(), "Publishing");
        for handler in handlers {
            let delivered = BackplaneMessage::from_json(&payload)?;
            handler(&delivered);
        }
        Ok(())
    }

    fn subscribe(&self, handler: BackplaneHandler) -> Result<SubscriptionId> {
        let id = SubscriptionId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.subscribers.write().push((id, handler));
        debug!(backplane = %self.name, subscription = id.0, "Backplane subscriber added");
        Ok(id)
    }

    fn unsubscribe(&self, id: SubscriptionId) -> Result<bool> {
        let mut subscribers = self.subscribers.write();
        let before = subscribers.len();
        subscribers.retain(|(existing, _)| *existing != id);
        Ok(subscribers.len() != before)
    }
}

impl std::fmt::Debug for InMemoryBackplane {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryBackplane")
            .field("name", &self.name)
            .field("subscribers", &self.subscriber_count())
            .field("published", &self.published_count())
            .finish()
    }
}
