//! Cache manager configuration with builder and validation
use crate::errors::{Error, Result};
use crate::item::ExpirationMode;
use crate::update::{UpdateItemConfig, UpdateMode, DEFAULT_MAX_RETRIES, DEFAULT_RETRY_TIMEOUT};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::time::Duration;

/// Handle type served by the built-in in-memory store
pub const DICTIONARY_HANDLE_TYPE: &str = "dictionary";

/// Configuration of one cache tier
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheHandleConfiguration {
    /// Name of the handle, unique within a manager
    pub handle_name: String,
    /// Selects the factory that constructs the handle
    pub handle_type: String,
    /// Expiration applied to items that carry none of their own
    #[serde(default)]
    pub expiration_mode: ExpirationMode,
    #[serde(default)]
    pub expiration_timeout: Duration,
    #[serde(default = "default_true")]
    pub enable_statistics: bool,
    #[serde(default)]
    pub enable_performance_counters: bool,
    /// Receives invalidations published by other manager instances
    #[serde(default)]
    pub is_backplane_source: bool,
}

fn default_true() -> bool {
    true
}

impl CacheHandleConfiguration {
    pub fn new(handle_type: impl Into<String>, handle_name: impl Into<String>) -> Self {
        Self {
            handle_name: handle_name.into(),
            handle_type: handle_type.into(),
            expiration_mode: ExpirationMode::None,
            expiration_timeout: Duration::ZERO,
            enable_statistics: true,
            enable_performance_counters: false,
            is_backplane_source: false,
        }
    }

    fn validate(&self) -> Result<()> {
        if self.handle_name.trim().is_empty() {
            return Err(Error::configuration("cache handle name must not be empty"));
        }
        if self.handle_type.trim().is_empty() {
            return Err(Error::configuration(format!(
                "cache handle '{}' has no handle type",
                self.handle_name
            )));
        }
        if self.expiration_mode != ExpirationMode::None && self.expiration_timeout.is_zero() {
            return Err(Error::configuration(format!(
                "expiration mode set without a valid timeout specified for handle '{}'",
                self.handle_name
            )));
        }
        Ok(())
    }
}

/// Configuration of the cross-instance invalidation channel
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackplaneConfiguration {
    /// Name of the backplane; must match the backplane handed to the manager
    pub name: String,
    /// Channel the messages travel on
    #[serde(default)]
    pub channel: Option<String>,
}

/// Complete configuration consumed by a cache manager
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheManagerConfiguration {
    pub name: String,
    /// Tiers in priority order; index 0 is consulted first
    pub handles: Vec<CacheHandleConfiguration>,
    #[serde(default)]
    pub update_mode: UpdateMode,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_retry_timeout")]
    pub retry_timeout: Duration,
    #[serde(default)]
    pub backplane: Option<BackplaneConfiguration>,
}

fn default_max_retries() -> u32 {
    DEFAULT_MAX_RETRIES
}

fn default_retry_timeout() -> Duration {
    DEFAULT_RETRY_TIMEOUT
}

impl CacheManagerConfiguration {
    /// Create an empty configuration with default retry settings
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            handles: Vec::new(),
            update_mode: UpdateMode::default(),
            max_retries: DEFAULT_MAX_RETRIES,
            retry_timeout: DEFAULT_RETRY_TIMEOUT,
            backplane: None,
        }
    }

    /// Retry policy used by updates that do not pass their own
    pub fn update_item_config(&self) -> UpdateItemConfig {
        UpdateItemConfig::new(self.max_retries, self.retry_timeout)
    }

    /// Look up a handle configuration by name, ignoring case
    pub fn handle(&self, handle_name: &str) -> Option<&CacheHandleConfiguration> {
        self.handles
            .iter()
            .find(|h| h.handle_name.eq_ignore_ascii_case(handle_name))
    }

    /// Check every rule a manager relies on
    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(Error::configuration("cache manager name must not be empty"));
        }
        if self.handles.is_empty() {
            return Err(Error::configuration(format!(
                "there are no cache handles linked to the cache manager configuration '{}'",
                self.name
            )));
        }
        if self.max_retries == 0 {
            return Err(Error::configuration(
                "maximum number of retries must be greater than zero",
            ));
        }

        let mut seen = HashSet::new();
        for handle in &self.handles {
            handle.validate()?;
            if !seen.insert(handle.handle_name.to_ascii_uppercase()) {
                return Err(Error::configuration(format!(
                    "cache handle '{}' is defined more than once",
                    handle.handle_name
                )));
            }
        }

        let has_source = self.handles.iter().any(|h| h.is_backplane_source);
        match &self.backplane {
            Some(backplane) => {
                if backplane.name.trim().is_empty() {
                    return Err(Error::configuration("backplane name must not be empty"));
                }
                if !has_source {
                    return Err(Error::configuration(format!(
                        "backplane '{}' is configured but no cache handle is marked as backplane source",
                        backplane.name
                    )));
                }
            }
            None if has_source => {
                return Err(Error::configuration(
                    "a cache handle is marked as backplane source but no backplane is configured",
                ));
            }
            None => {}
        }

        Ok(())
    }
}

/// Builder for a single handle configuration, used from [`ConfigurationBuilder::with_handle`]
pub struct HandleConfigurationBuilder {
    config: CacheHandleConfiguration,
}

impl HandleConfigurationBuilder {
    fn new(handle_type: &str, handle_name: &str) -> Self {
        Self {
            config: CacheHandleConfiguration::new(handle_type, handle_name),
        }
    }

    /// Set the expiration applied to items without their own
    pub fn with_expiration(mut self, mode: ExpirationMode, timeout: Duration) -> Self {
        self.config.expiration_mode = mode;
        self.config.expiration_timeout = timeout;
        self
    }

    pub fn enable_statistics(mut self) -> Self {
        self.config.enable_statistics = true;
        self
    }

    /// Disabling statistics disables performance counters as well
    pub fn disable_statistics(mut self) -> Self {
        self.config.enable_statistics = false;
        self.config.enable_performance_counters = false;
        self
    }

    /// Performance counters need statistics, so this enables both
    pub fn enable_performance_counters(mut self) -> Self {
        self.config.enable_performance_counters = true;
        self.config.enable_statistics = true;
        self
    }

    pub fn disable_performance_counters(mut self) -> Self {
        self.config.enable_performance_counters = false;
        self
    }

    /// Mark the handle as the one remote invalidations are applied to
    pub fn as_backplane_source(mut self) -> Self {
        self.config.is_backplane_source = true;
        self
    }

    pub fn build(self) -> CacheHandleConfiguration {
        self.config
    }
}

/// Builder for creating cache manager configurations
pub struct ConfigurationBuilder {
    config: CacheManagerConfiguration,
}

impl ConfigurationBuilder {
    /// Create a new builder with default settings
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            config: CacheManagerConfiguration::new(name),
        }
    }

    /// Append a tier; tiers keep the order they are added in
    pub fn with_handle<F>(mut self, handle_type: &str, handle_name: &str, configure: F) -> Self
    where
        F: FnOnce(HandleConfigurationBuilder) -> HandleConfigurationBuilder,
    {
        let handle = configure(HandleConfigurationBuilder::new(handle_type, handle_name)).build();
        self.config.handles.push(handle);
        self
    }

    /// Append an in-memory tier with default settings
    pub fn with_dictionary_handle(self, handle_name: &str) -> Self {
        self.with_handle(DICTIONARY_HANDLE_TYPE, handle_name, |h| h)
    }

    pub fn with_update_mode(mut self, update_mode: UpdateMode) -> Self {
        self.config.update_mode = update_mode;
        self
    }

    pub fn with_max_retries(mut self, retries: u32) -> Self {
        self.config.max_retries = retries;
        self
    }

    pub fn with_retry_timeout(mut self, timeout: Duration) -> Self {
        self.config.retry_timeout = timeout;
        self
    }

    /// Attach a backplane; at least one handle must be marked as its source
    pub fn with_backplane(mut self, name: impl Into<String>, channel: Option<String>) -> Self {
        self.config.backplane = Some(BackplaneConfiguration {
            name: name.into(),
            channel,
        });
        self
    }

    /// Validate and return the configuration
    pub fn build(self) -> Result<CacheManagerConfiguration> {
        self.config.validate()?;
        Ok(self.config)
    }
}

/// Parse a timeout such as `"30s"`, `"5m"`, `"2h"`. A bare number is read as minutes
/// and an empty value as zero.
pub fn parse_timeout(value: &str, property: &str) -> Result<Duration> {
    let normalized = value.trim().to_ascii_uppercase();
    if normalized.is_empty() {
        return Ok(Duration::ZERO);
    }

    let (digits, multiplier) = match normalized.chars().last() {
        Some('S') => (&normalized[..normalized.len() - 1], 1),
        Some('M') => (&normalized[..normalized.len() - 1], 60),
        Some('H') => (&normalized[..normalized.len() - 1], 3600),
        _ => (normalized.as_str(), 60),
    };

    let amount: u64 = digits.parse().map_err(|_| {
        Error::configuration(format!(
            "the value of the property '{property}' cannot be parsed [{value}]"
        ))
    })?;

    Ok(Duration::from_secs(amount.saturating_mul(multiplier)))
}
