//! Core domain types and errors for `tiercache`.
//!
//! This crate holds the data every tier and the coordinator agree on. It has
//! no storage or concurrency logic of its own.
//!
//! ## Key Components
//!
//! - **`errors`**: The primary `Error` enum and `Result` alias shared by all
//!   handles, the manager and the backplane.
//! - **`item`**: `CacheItem`, expiration modes and the `region:key` addressing
//!   helpers.
//! - **`update`**: Update retry policy, update results and the promotion mode.
//! - **`config`**: Manager and handle configuration with a validating builder.
//! - **`events`**: The events a manager raises per operation.

pub mod config;
pub mod errors;
pub mod events;
pub mod item;
pub mod update;

pub use self::{
    config::{
        parse_timeout, BackplaneConfiguration, CacheHandleConfiguration,
        CacheManagerConfiguration, ConfigurationBuilder, HandleConfigurationBuilder,
        DICTIONARY_HANDLE_TYPE,
    },
    errors::{Error, Result},
    events::{CacheEvent, CacheEventKind},
    item::{
        full_key, region_prefix, validate_address, validate_key, validate_region, CacheItem,
        ExpirationMode,
    },
    update::{UpdateItemConfig, UpdateItemResult, UpdateMode},
};
