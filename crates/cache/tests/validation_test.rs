//! Argument and configuration validation

mod common;

use common::{statistic, TestManagerBuilder};
use rstest::rstest;
use std::sync::Arc;
use std::time::Duration;
use tiercache::CacheStatsCounterType::*;
use tiercache::{
    Backplane, CacheFactory, CacheHandle, CacheManager, CacheManagerConfiguration,
    ConfigurationBuilder, DictionaryCacheHandle, Error, ExpirationMode, InMemoryBackplane,
};

fn manager() -> CacheManager<i32> {
    TestManagerBuilder::new(2).build()
}

#[rstest]
#[case::empty("")]
#[case::blank("   ")]
#[case::tab("\t")]
fn test_invalid_keys_rejected_before_any_tier(#[case] key: &str) {
    let cache = manager();

    assert!(cache.get(key).unwrap_err().is_invalid_argument());
    assert!(cache.add(key, 1).unwrap_err().is_invalid_argument());
    assert!(cache.put(key, 1).unwrap_err().is_invalid_argument());
    assert!(cache.remove(key).unwrap_err().is_invalid_argument());
    assert!(cache.update(key, |v| *v).unwrap_err().is_invalid_argument());

    assert_eq!(statistic(&cache, GetCalls), vec![0, 0]);
    assert_eq!(statistic(&cache, RemoveCalls), vec![0, 0]);
    assert_eq!(statistic(&cache, PutCalls), vec![0, 0]);
}

#[rstest]
#[case::empty("")]
#[case::blank(" ")]
fn test_invalid_regions_rejected(#[case] region: &str) {
    let cache = manager();

    assert!(cache.get_in_region("key", region).unwrap_err().is_invalid_argument());
    assert!(cache.add_in_region("key", region, 1).unwrap_err().is_invalid_argument());
    assert!(cache.put_in_region("key", region, 1).unwrap_err().is_invalid_argument());
    assert!(cache.remove_in_region("key", region).unwrap_err().is_invalid_argument());
    assert!(cache.clear_region(region).unwrap_err().is_invalid_argument());
    assert_eq!(statistic(&cache, ClearRegionCalls), vec![0, 0]);
}

fn configuration_error(result: tiercache::Result<CacheManagerConfiguration>) -> String {
    match result {
        Err(Error::Configuration { message }) => message,
        other => panic!("expected configuration error, got {other:?}"),
    }
}

#[test]
fn test_configuration_without_handles() {
    let message = configuration_error(ConfigurationBuilder::new("cache").build());
    assert!(message.contains("no cache handles"));
}

#[test]
fn test_duplicate_handle_names() {
    let message = configuration_error(
        ConfigurationBuilder::new("cache")
            .with_dictionary_handle("memory")
            .with_dictionary_handle("MEMORY")
            .build(),
    );
    assert!(message.contains("more than once"));
}

#[test]
fn test_zero_retries() {
    configuration_error(
        ConfigurationBuilder::new("cache")
            .with_dictionary_handle("memory")
            .with_max_retries(0)
            .build(),
    );
}

#[test]
fn test_expiration_without_timeout() {
    let message = configuration_error(
        ConfigurationBuilder::new("cache")
            .with_handle("dictionary", "memory", |h| {
                h.with_expiration(ExpirationMode::Sliding, Duration::ZERO)
            })
            .build(),
    );
    assert!(message.contains("timeout"));
}

#[test]
fn test_backplane_requires_source_handle() {
    configuration_error(
        ConfigurationBuilder::new("cache")
            .with_dictionary_handle("memory")
            .with_backplane("bus", None)
            .build(),
    );
    configuration_error(
        ConfigurationBuilder::new("cache")
            .with_handle("dictionary", "memory", |h| h.as_backplane_source())
            .build(),
    );
}

#[test]
fn test_manager_rejects_mismatched_handles() {
    let configuration = ConfigurationBuilder::new("cache")
        .with_dictionary_handle("first")
        .with_dictionary_handle("second")
        .build()
        .unwrap();

    let only_one: Vec<Arc<dyn CacheHandle<i32>>> = vec![Arc::new(
        DictionaryCacheHandle::<i32>::dictionary(configuration.handles[0].clone()),
    ) as Arc<dyn CacheHandle<i32>>];
    let err = CacheManager::new(configuration.clone(), only_one, None).unwrap_err();
    assert!(matches!(err, Error::Configuration { .. }));

    let swapped: Vec<Arc<dyn CacheHandle<i32>>> = configuration
        .handles
        .iter()
        .rev()
        .map(|c| {
            Arc::new(DictionaryCacheHandle::<i32>::dictionary(c.clone()))
                as Arc<dyn CacheHandle<i32>>
        })
        .collect();
    let err = CacheManager::new(configuration, swapped, None).unwrap_err();
    assert!(err.to_string().contains("second"));
}

#[test]
fn test_backplane_must_match_configuration() {
    let with_backplane = ConfigurationBuilder::new("cache")
        .with_handle("dictionary", "memory", |h| h.as_backplane_source())
        .with_backplane("bus", Some("invalidation".to_string()))
        .build()
        .unwrap();
    let factory = CacheFactory::<i32>::new();

    let missing = factory.build(with_backplane.clone(), None).unwrap_err();
    assert!(missing.to_string().contains("none was supplied"));

    let wrong: Arc<dyn Backplane> = Arc::new(InMemoryBackplane::new("other"));
    assert!(factory.build(with_backplane.clone(), Some(wrong)).is_err());

    let right: Arc<dyn Backplane> = Arc::new(InMemoryBackplane::new("bus"));
    assert!(factory.build(with_backplane, Some(right)).is_ok());

    let without_backplane = ConfigurationBuilder::new("cache")
        .with_dictionary_handle("memory")
        .build()
        .unwrap();
    let unexpected: Arc<dyn Backplane> = Arc::new(InMemoryBackplane::new("bus"));
    assert!(factory.build(without_backplane, Some(unexpected)).is_err());
}

#[test]
fn test_configuration_from_json() {
    let configuration: CacheManagerConfiguration = serde_json::from_str(
        r#"{
            "name": "json",
            "handles": [
                { "handle_name": "memory", "handle_type": "dictionary" }
            ],
            "update_mode": "all"
        }"#,
    )
    .unwrap();

    let cache = CacheFactory::<i32>::new().build(configuration, None).unwrap();
    assert_eq!(cache.name(), "json");
    assert!(cache.handle("MEMORY").is_some());
}
