//! Optimistic read-modify-write shared by every store

use super::store::{CacheStore, Lookup, UpdateOutcome};
use std::thread;
use tiercache_core::{Result, UpdateItemConfig, UpdateItemResult};
use tracing::trace;

/// Apply `update_value` to the item stored under `key` without taking a lock.
///
/// Each attempt reads the current item, computes the new value and
/// compare-and-replaces against the instance it read. A lost race counts as a
/// retry; after `config.max_retries` retries the result reports a conflict
/// with `updated == false`. A missing key yields `updated == false` without a
/// conflict; if the store dropped an expired item on the way, the outcome
/// says so. Errors only come from the store itself.
pub fn optimistic_update<V, S>(
    store: &S,
    key: &str,
    region: Option<&str>,
    update_value: &dyn Fn(&V) -> V,
    config: &UpdateItemConfig,
) -> Result<UpdateOutcome>
where
    S: CacheStore<V> + ?Sized,
{
    let mut retries: u32 = 0;
    loop {
        let current = match store.get_item(key, region)? {
            Lookup::Found(item) => item,
            Lookup::Missing => return Ok(UpdateItemResult::not_found(retries).into()),
            Lookup::Expired => {
                return Ok(UpdateOutcome {
                    result: UpdateItemResult::not_found(retries),
                    dropped_expired: true,
                })
            }
        };

        let replacement = current.with_value(update_value(current.value()));
        if store.replace_item(&current, replacement)? {
            return Ok(UpdateItemResult::success(retries).into());
        }

        retries = retries.saturating_add(1);
        if retries > config.max_retries {
            trace!(key, ?region, retries, "Giving up optimistic update");
            return Ok(UpdateItemResult::conflict(retries).into());
        }

        trace!(key, ?region, retries, "Version conflict, retrying update");
        if !config.retry_timeout.is_zero() {
            thread::sleep(config.retry_timeout);
        }
    }
}
