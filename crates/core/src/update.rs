//! Update policies and results

use crate::errors::Error;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

/// Default wait between two optimistic update attempts
pub const DEFAULT_RETRY_TIMEOUT: Duration = Duration::from_millis(10);

/// Default bound on optimistic update retries
pub const DEFAULT_MAX_RETRIES: u32 = u32::MAX;

/// How a read hit in a slower tier is propagated to the other tiers
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UpdateMode {
    /// Tiers are never backfilled
    None,
    /// Backfill every faster tier above the hit
    #[default]
    Up,
    /// Backfill every tier except the one that served the hit
    All,
}

impl fmt::Display for UpdateMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UpdateMode::None => write!(f, "none"),
            UpdateMode::Up => write!(f, "up"),
            UpdateMode::All => write!(f, "all"),
        }
    }
}

impl FromStr for UpdateMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "none" => Ok(UpdateMode::None),
            "up" => Ok(UpdateMode::Up),
            "all" => Ok(UpdateMode::All),
            other => Err(Error::configuration(format!("unknown update mode '{other}'"))),
        }
    }
}

/// Retry policy for a single update call
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateItemConfig {
    /// Attempts allowed after the first one before giving up
    pub max_retries: u32,
    /// Sleep between two attempts
    pub retry_timeout: Duration,
}

impl UpdateItemConfig {
    pub fn new(max_retries: u32, retry_timeout: Duration) -> Self {
        Self {
            max_retries,
            retry_timeout,
        }
    }
}

impl Default for UpdateItemConfig {
    fn default() -> Self {
        Self {
            max_retries: DEFAULT_MAX_RETRIES,
            retry_timeout: DEFAULT_RETRY_TIMEOUT,
        }
    }
}

/// Outcome of an update, per handle or aggregated over handles.
///
/// Running out of retries is reported here with `updated == false`; it is
/// never an error.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateItemResult {
    pub version_conflict_occurred: bool,
    pub updated: bool,
    pub retries: u32,
}

impl UpdateItemResult {
    pub fn new(version_conflict_occurred: bool, updated: bool, retries: u32) -> Self {
        Self {
            version_conflict_occurred,
            updated,
            retries,
        }
    }

    /// The value was written after `retries` failed attempts
    pub fn success(retries: u32) -> Self {
        Self::new(retries > 0, true, retries)
    }

    /// No item existed for the key
    pub fn not_found(retries: u32) -> Self {
        Self::new(retries > 0, false, retries)
    }

    /// Every attempt lost against a concurrent writer
    pub fn conflict(retries: u32) -> Self {
        Self::new(true, false, retries)
    }

    /// Whether the key was absent, as opposed to contended
    pub fn is_not_found(&self) -> bool {
        !self.updated && !self.version_conflict_occurred
    }
}
