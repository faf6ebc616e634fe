//! Cache items and key addressing

use crate::errors::{Error, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

/// Separator between region and key in a full key
pub const REGION_SEPARATOR: &str = ":";

/// How an item expires inside the handle that stores it
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExpirationMode {
    /// Never expires
    #[default]
    None,
    /// Expires after the timeout elapses without an access
    Sliding,
    /// Expires once the timeout elapses after creation
    Absolute,
}

impl fmt::Display for ExpirationMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExpirationMode::None => write!(f, "none"),
            ExpirationMode::Sliding => write!(f, "sliding"),
            ExpirationMode::Absolute => write!(f, "absolute"),
        }
    }
}

impl FromStr for ExpirationMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "none" => Ok(ExpirationMode::None),
            "sliding" => Ok(ExpirationMode::Sliding),
            "absolute" => Ok(ExpirationMode::Absolute),
            other => Err(Error::configuration(format!(
                "unknown expiration mode '{other}'"
            ))),
        }
    }
}

/// Fail unless `key` holds at least one non-whitespace character
pub fn validate_key(key: &str) -> Result<()> {
    if key.trim().is_empty() {
        return Err(Error::invalid_argument("key", "key must not be empty"));
    }
    Ok(())
}

/// Fail unless `region` holds at least one non-whitespace character
pub fn validate_region(region: &str) -> Result<()> {
    if region.trim().is_empty() {
        return Err(Error::invalid_argument("region", "region must not be empty"));
    }
    Ok(())
}

/// Validate a key together with its optional region
pub fn validate_address(key: &str, region: Option<&str>) -> Result<()> {
    validate_key(key)?;
    if let Some(region) = region {
        validate_region(region)?;
    }
    Ok(())
}

/// Build the key an item is stored under: `region:key`, or `key` without a region
pub fn full_key(key: &str, region: Option<&str>) -> String {
    match region {
        Some(region) => format!("{region}{REGION_SEPARATOR}{key}"),
        None => key.to_string(),
    }
}

/// Prefix shared by every full key inside `region`
pub fn region_prefix(region: &str) -> String {
    format!("{region}{REGION_SEPARATOR}")
}

/// A single cached value together with its addressing and expiration metadata.
///
/// Items are immutable. Replacing the value goes through [`CacheItem::with_value`],
/// which produces a new item so handles can tell whether the instance they read
/// is still the one stored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheItem<V> {
    key: String,
    region: Option<String>,
    value: V,
    value_type: String,
    expiration_mode: ExpirationMode,
    expiration_timeout: Duration,
    created_at: DateTime<Utc>,
    last_accessed_at: DateTime<Utc>,
}

impl<V> CacheItem<V> {
    /// Create an item without region and without expiration
    pub fn new(key: impl Into<String>, value: V) -> Result<Self> {
        Self::build(key.into(), None, value, ExpirationMode::None, Duration::ZERO)
    }

    /// Create an item scoped to `region`
    pub fn in_region(key: impl Into<String>, region: impl Into<String>, value: V) -> Result<Self> {
        Self::build(
            key.into(),
            Some(region.into()),
            value,
            ExpirationMode::None,
            Duration::ZERO,
        )
    }

    /// Create an item with explicit expiration settings
    pub fn with_expiration(
        key: impl Into<String>,
        region: Option<String>,
        value: V,
        expiration_mode: ExpirationMode,
        expiration_timeout: Duration,
    ) -> Result<Self> {
        if expiration_mode != ExpirationMode::None && expiration_timeout.is_zero() {
            return Err(Error::invalid_argument(
                "expiration_timeout",
                format!("expiration mode '{expiration_mode}' requires a non-zero timeout"),
            ));
        }
        Self::build(key.into(), region, value, expiration_mode, expiration_timeout)
    }

    fn build(
        key: String,
        region: Option<String>,
        value: V,
        expiration_mode: ExpirationMode,
        expiration_timeout: Duration,
    ) -> Result<Self> {
        validate_address(&key, region.as_deref())?;
        let now = Utc::now();
        Ok(Self {
            key,
            region,
            value,
            value_type: std::any::type_name::<V>().to_string(),
            expiration_mode,
            expiration_timeout,
            created_at: now,
            last_accessed_at: now,
        })
    }

    /// Produce a new item carrying `value` and this item's key, region and expiration.
    /// `created_at` is kept, `last_accessed_at` is refreshed.
    pub fn with_value(&self, value: V) -> Self {
        Self {
            key: self.key.clone(),
            region: self.region.clone(),
            value,
            value_type: self.value_type.clone(),
            expiration_mode: self.expiration_mode,
            expiration_timeout: self.expiration_timeout,
            created_at: self.created_at,
            last_accessed_at: Utc::now(),
        }
    }

    /// Replace the expiration settings, keeping everything else
    pub fn with_expiration_settings(mut self, mode: ExpirationMode, timeout: Duration) -> Self {
        self.expiration_mode = mode;
        self.expiration_timeout = timeout;
        self
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn region(&self) -> Option<&str> {
        self.region.as_deref()
    }

    pub fn value(&self) -> &V {
        &self.value
    }

    pub fn into_value(self) -> V {
        self.value
    }

    /// Name of the value's Rust type, recorded at creation
    pub fn value_type(&self) -> &str {
        &self.value_type
    }

    pub fn expiration_mode(&self) -> ExpirationMode {
        self.expiration_mode
    }

    pub fn expiration_timeout(&self) -> Duration {
        self.expiration_timeout
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn last_accessed_at(&self) -> DateTime<Utc> {
        self.last_accessed_at
    }

    /// The key this item is stored under inside a handle
    pub fn full_key(&self) -> String {
        full_key(&self.key, self.region.as_deref())
    }

    /// Whether the item has expired at `now`, given when it was last accessed
    pub fn is_expired_at(&self, now: DateTime<Utc>, last_access: DateTime<Utc>) -> bool {
        let reference = match self.expiration_mode {
            ExpirationMode::None => return false,
            ExpirationMode::Absolute => self.created_at,
            ExpirationMode::Sliding => last_access,
        };
        match chrono::Duration::from_std(self.expiration_timeout) {
            Ok(timeout) => now - reference >= timeout,
            // A timeout too large for chrono never elapses
            Err(_) => false,
        }
    }

    /// Whether the item has expired by now, judged on its own timestamps
    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Utc::now(), self.last_accessed_at)
    }
}
