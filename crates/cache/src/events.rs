//! Event hub for publishing cache manager events

use crossbeam::channel::{self, Receiver, Sender};
use parking_lot::{Mutex, RwLock};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tiercache_core::{CacheEvent, CacheEventKind};
use tracing::{debug, trace};

/// Callback invoked for every matching event
pub type EventCallback = Arc<dyn Fn(&CacheEvent) + Send + Sync>;

/// Identifies a subscription so it can be removed again
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EventSubscriptionId(u64);

struct Subscription {
    id: EventSubscriptionId,
    kind: Option<CacheEventKind>,
    callback: EventCallback,
}

/// Observer registry owned by one cache manager.
///
/// Callbacks run synchronously on the calling thread, in subscription order.
/// Channel receivers get a copy of every event; receivers that were dropped
/// are pruned on the next publish.
pub struct EventHub {
    next_id: AtomicU64,
    subscribers: RwLock<Vec<Subscription>>,
    channels: Mutex<Vec<Sender<CacheEvent>>>,
}

impl EventHub {
    pub fn new() -> Self {
        Self {
            next_id: AtomicU64::new(1),
            subscribers: RwLock::new(Vec::new()),
            channels: Mutex::new(Vec::new()),
        }
    }

    fn register(
        &self,
        kind: Option<CacheEventKind>,
        callback: EventCallback,
    ) -> EventSubscriptionId {
        let id = EventSubscriptionId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.subscribers.write().push(Subscription { id, kind, callback });
        debug!(subscription = id.0, ?kind, "Event subscriber added");
        id
    }

    /// Subscribe to one kind of event
    pub fn subscribe<F>(&self, kind: CacheEventKind, callback: F) -> EventSubscriptionId
    where
        F: Fn(&CacheEvent) + Send + Sync + 'static,
    {
        self.register(Some(kind), Arc::new(callback))
    }

    /// Subscribe to every event
    pub fn subscribe_all<F>(&self, callback: F) -> EventSubscriptionId
    where
        F: Fn(&CacheEvent) + Send + Sync + 'static,
    {
        self.register(None, Arc::new(callback))
    }

    /// Remove a subscription; returns whether it existed
    pub fn unsubscribe(&self, id: EventSubscriptionId) -> bool {
        let mut subscribers = self.subscribers.write();
        let initial_len = subscribers.len();
        subscribers.retain(|s| s.id != id);
        let removed = subscribers.len() != initial_len;
        if removed {
            debug!(subscription = id.0, "Event subscriber removed");
        }
        removed
    }

    /// Create a channel that receives a copy of every event
    pub fn receiver(&self) -> Receiver<CacheEvent> {
        let (sender, receiver) = channel::unbounded();
        self.channels.lock().push(sender);
        receiver
    }

    /// Get the number of registered callbacks
    pub fn subscriber_count(&self) -> usize {
        self.subscribers.read().len()
    }

    /// Deliver an event to every interested subscriber and channel
    pub fn publish(&self, event: CacheEvent) {
        // Callbacks may subscribe or unsubscribe, so they run without the lock held
        let interested: Vec<EventCallback> = self
            .subscribers
            .read()
            .iter()
            .filter(|s| s.kind.map_or(true, |kind| kind == event.kind()))
            .map(|s| Arc::clone(&s.callback))
            .collect();

        for callback in &interested {
            callback(&event);
        }

        let mut channels = self.channels.lock();
        if !channels.is_empty() {
            channels.retain(|sender| sender.send(event.clone()).is_ok());
        }

        trace!(
            kind = ?event.kind(),
            subscribers_notified = interested.len(),
            "Cache event published"
        );
    }
}

impl Default for EventHub {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for EventHub {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventHub")
            .field("subscribers", &self.subscriber_count())
            .field("channels", &self.channels.lock().len())
            .finish()
    }
}
