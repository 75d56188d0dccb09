//! Freshness checks backed by the updated mods feed
//!
//! Re-fetching a mod or its file list just because its cache entry got old
//! costs one rate-limited call per mod. The updated mods feed lists, in a single
//! call, every mod of a game that changed over the last month. When a cached
//! resource is younger than that window, the feed tells whether it can still
//! be trusted. A positive answer also moves the resource's cache timestamp up
//! to the time the feed was fetched, so the next check starts from there.

use chrono::{DateTime, Duration, Utc};
use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

use super::fetch::CachedFetcher;
use super::policy::PolicyError;
use super::store::StoreError;

/// How far back the one-month updated mods feed reaches, in days
pub const FEED_HORIZON_DAYS: i64 = 30;

/// Outcome of a freshness check
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Freshness {
    /// The cached copy is known to be current
    Fresh,
    /// The cached copy is missing, too old to verify, or outdated
    NotFresh,
}

impl Freshness {
    pub fn is_fresh(&self) -> bool {
        matches!(self, Self::Fresh)
    }
}

/// Which feed timestamp applies to a resource
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeField {
    /// Any activity on the mod itself (`latest_mod_activity`)
    Entity,
    /// A change in the mod's file list (`latest_file_update`)
    SubList,
}

/// A cached resource whose freshness can be checked against the feed
#[derive(Debug, Clone, Copy)]
pub struct TrackedResource<'a> {
    /// Cache key of the resource
    pub key: &'a str,
    /// Cache key of the one-month updated mods feed of the resource's game
    pub feed_key: &'a str,
    /// Mod id as reported by the feed
    pub item_id: u64,
    /// Feed timestamp to compare with
    pub field: ChangeField,
}

/// One entry of the updated mods feed
#[derive(Debug, Deserialize)]
struct FeedEntry {
    mod_id: u64,
    #[serde(with = "chrono::serde::ts_seconds")]
    latest_file_update: DateTime<Utc>,
    #[serde(with = "chrono::serde::ts_seconds")]
    latest_mod_activity: DateTime<Utc>,
}

impl FeedEntry {
    fn changed_at(&self, field: ChangeField) -> DateTime<Utc> {
        match field {
            ChangeField::Entity => self.latest_mod_activity,
            ChangeField::SubList => self.latest_file_update,
        }
    }
}

/// Checks whether the cached copy of `resource` is still current
///
/// The feed is fetched through `fetcher`, so it is itself cached under
/// `resource.feed_key`; `feed_origin` is only called when the feed is not
/// cached. The resource itself is never fetched: a `NotFresh` answer is
/// meant to make the caller bypass the cache on its next fetch.
///
/// # Errors
/// Errors of the feed fetch are propagated, as are feed payloads that are not
/// a list of updated mods.
pub fn check_freshness<E, F>(
    fetcher: &mut CachedFetcher,
    resource: &TrackedResource<'_>,
    feed_origin: F,
) -> Result<Freshness, E>
where
    E: From<PolicyError> + From<StoreError> + From<serde_json::Error>,
    F: FnOnce() -> Result<Value, E>,
{
    let Some(cached_at) = fetcher.freshness_timestamp(resource.key) else {
        debug!("{} is not cached", resource.key);
        return Ok(Freshness::NotFresh);
    };

    if Utc::now() - cached_at > Duration::days(FEED_HORIZON_DAYS) {
        debug!(
            "{} was cached at {}, beyond the updated mods feed horizon",
            resource.key, cached_at
        );
        return Ok(Freshness::NotFresh);
    }

    let feed = fetcher.fetch(resource.feed_key, false, feed_origin)?;
    let entries: Vec<FeedEntry> = serde_json::from_value(feed)?;
    let feed_fetched_at = fetcher.freshness_timestamp(resource.feed_key);

    let fresh = match entries.iter().find(|entry| entry.mod_id == resource.item_id) {
        None => true,
        Some(entry) => cached_at >= entry.changed_at(resource.field),
    };
    if !fresh {
        debug!("{} changed after it was cached at {}", resource.key, cached_at);
        return Ok(Freshness::NotFresh);
    }

    if let Some(feed_fetched_at) = feed_fetched_at.filter(|time| *time > cached_at) {
        debug!(
            "{} confirmed fresh, moving its cache timestamp to {}",
            resource.key, feed_fetched_at
        );
        fetcher.set_freshness_timestamp(resource.key, feed_fetched_at)?;
    }
    Ok(Freshness::Fresh)
}
