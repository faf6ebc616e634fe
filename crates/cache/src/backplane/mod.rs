//! Cross-instance invalidation
//!
//! Managers that share a distributed tier keep their local tiers consistent
//! by publishing a [`BackplaneMessage`] after every remove or clear. Peers
//! apply the same operation to their handles flagged `is_backplane_source`.
//! Delivery is at-least-once and unordered, and applying a message twice is
//! harmless.

mod memory;

pub use memory::InMemoryBackplane;

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tiercache_core::Result;
use uuid::Uuid;

/// Operation a peer should replay on its source handles
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum BackplaneAction {
    Removed { key: String, region: Option<String> },
    Cleared,
    ClearedRegion { region: String },
}

/// Invalidation message as it travels between manager instances
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackplaneMessage {
    /// Instance id of the publishing manager
    pub origin: Uuid,
    #[serde(flatten)]
    pub action: BackplaneAction,
}

impl BackplaneMessage {
    pub fn new(origin: Uuid, action: BackplaneAction) -> Self {
        Self { origin, action }
    }

    pub fn removed(origin: Uuid, key: impl Into<String>, region: Option<&str>) -> Self {
        Self::new(
            origin,
            BackplaneAction::Removed {
                key: key.into(),
                region: region.map(str::to_owned),
            },
        )
    }

    pub fn cleared(origin: Uuid) -> Self {
        Self::new(origin, BackplaneAction::Cleared)
    }

    pub fn cleared_region(origin: Uuid, region: impl Into<String>) -> Self {
        Self::new(
            origin,
            BackplaneAction::ClearedRegion {
                region: region.into(),
            },
        )
    }

    /// Serialize for a transport
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn from_json(payload: &str) -> Result<Self> {
        Ok(serde_json::from_str(payload)?)
    }
}

/// Callback receiving every message published on a backplane
pub type BackplaneHandler = Arc<dyn Fn(&BackplaneMessage) + Send + Sync>;

/// Identifies a backplane subscription
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(pub u64);

/// Publish/subscribe channel shared by manager instances.
///
/// Subscribers receive every message, including their own; filtering by
/// [`BackplaneMessage::origin`] is the receiver's job.
pub trait Backplane: Send + Sync {
    fn name(&self) -> &str;

    fn publish(&self, message: &BackplaneMessage) -> Result<()>;

    fn subscribe(&self, handler: BackplaneHandler) -> Result<SubscriptionId>;

    /// Returns whether the subscription existed
    fn unsubscribe(&self, id: SubscriptionId) -> Result<bool>;
}
