//! Read-through caching around API calls
//!
//! [`CachedFetcher`] wraps any "fetch from the API" closure: it serves the
//! stored response while it is younger than the expiry of its category, calls
//! the closure otherwise, and persists the store after every real fetch.

use chrono::{DateTime, Utc};
use serde_json::Value;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;

use super::policy::{ExpiryPolicy, PolicyError, ResourceCategory};
use super::store::{EntryContext, PersistentStore, StoreError};

/// Expiry-aware cache in front of API calls
///
/// The fetcher owns the store and the policy. When a cache file is configured
/// the store is loaded from it at construction and saved to it after every
/// cache miss; without a file the cache only lives in memory.
#[derive(Debug)]
pub struct CachedFetcher {
    store: PersistentStore,
    policy: ExpiryPolicy,
    cache_file: Option<PathBuf>,
    /// Expiry already computed per key
    expiries: HashMap<String, Duration>,
}

impl CachedFetcher {
    /// Creates a fetcher with an in-memory cache only
    pub fn in_memory(policy: ExpiryPolicy) -> Self {
        Self {
            store: PersistentStore::new(),
            policy,
            cache_file: None,
            expiries: HashMap::new(),
        }
    }

    /// Creates a fetcher persisted to `cache_file`, loading its current content
    ///
    /// # Errors
    /// Returns a `StoreError` if the file exists but cannot be read or parsed.
    pub fn with_file(policy: ExpiryPolicy, cache_file: PathBuf) -> Result<Self, StoreError> {
        let mut store = PersistentStore::new();
        store.load(&cache_file)?;
        Ok(Self {
            store,
            policy,
            cache_file: Some(cache_file),
            expiries: HashMap::new(),
        })
    }

    /// The underlying store
    pub fn store(&self) -> &PersistentStore {
        &self.store
    }

    /// The expiry policy in use
    pub fn policy(&self) -> &ExpiryPolicy {
        &self.policy
    }

    /// The file the cache is persisted to, if any
    pub fn cache_file(&self) -> Option<&Path> {
        self.cache_file.as_deref()
    }

    /// Returns the response for `key`, calling `origin` only when needed
    ///
    /// # Arguments
    /// * `key` - Cache key of the request
    /// * `bypass` - Drop any cached value first, forcing a call to `origin`
    /// * `origin` - Performs the real API call
    ///
    /// # Errors
    /// * `PolicyError` (converted into `E`) when the key shape is unknown,
    ///   before `origin` is ever called
    /// * The error of `origin`, unchanged; nothing is cached in that case
    /// * `StoreError` (converted into `E`) when saving the cache file fails;
    ///   the fetched value is dropped again so it is not served afterwards
    pub fn fetch<E, F>(&mut self, key: &str, bypass: bool, origin: F) -> Result<Value, E>
    where
        E: From<PolicyError> + From<StoreError>,
        F: FnOnce() -> Result<Value, E>,
    {
        let expiry = self.expiry_for(key)?;

        if bypass && self.store.delete(key).is_some() {
            debug!("Cache bypass requested for {}", key);
        }

        let expired = self
            .store
            .context(key)
            .is_some_and(|context| is_expired(context, expiry, Utc::now()));
        if expired && self.store.delete(key).is_some() {
            debug!("Cache entry expired for {}", key);
        }

        if let Some(value) = self.store.get(key) {
            debug!("Cache hit for {}", key);
            return Ok(value.clone());
        }

        debug!("Cache miss for {}", key);
        let value = origin()?;
        self.store
            .put(key, value.clone(), EntryContext::fetched_at(Utc::now()));
        if let Err(err) = self.persist() {
            // A value that could not be saved is not served
            self.store.delete(key);
            return Err(err.into());
        }
        Ok(value)
    }

    /// When the cached value of `key` was last confirmed fresh
    ///
    /// Returns `None` when nothing is cached for `key`.
    pub fn freshness_timestamp(&self, key: &str) -> Option<DateTime<Utc>> {
        if !self.store.exists(key) {
            return None;
        }
        self.store.context(key).and_then(|c| c.invalidate_time)
    }

    /// Overrides when the cached value of `key` was last confirmed fresh
    ///
    /// The caller vouches for the timestamp: nothing is fetched or validated.
    /// The cache file is saved afterwards.
    pub fn set_freshness_timestamp(
        &mut self,
        key: &str,
        timestamp: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        self.store
            .set_context(key, EntryContext::fetched_at(timestamp));
        self.persist()
    }

    /// Drops the cached value of one key and saves the cache file
    pub fn clear(&mut self, key: &str) -> Result<(), StoreError> {
        self.store.delete(key);
        self.persist()
    }

    /// Drops every cached value and saves the cache file
    pub fn clear_all(&mut self) -> Result<(), StoreError> {
        self.store.clear();
        self.expiries.clear();
        self.persist()
    }

    /// Saves the store if a cache file is configured
    pub fn persist(&mut self) -> Result<(), StoreError> {
        match &self.cache_file {
            Some(path) => self.store.save(path),
            None => Ok(()),
        }
    }

    fn expiry_for(&mut self, key: &str) -> Result<Duration, PolicyError> {
        if let Some(expiry) = self.expiries.get(key) {
            return Ok(*expiry);
        }
        let category = ResourceCategory::of_key(key)?;
        let expiry = self.policy.expiry_for_category(category);
        self.expiries.insert(key.to_string(), expiry);
        Ok(expiry)
    }
}

/// Whether a cached value has outlived its expiry at `now`
fn is_expired(context: &EntryContext, expiry: Duration, now: DateTime<Utc>) -> bool {
    let Some(fetched_at) = context.invalidate_time else {
        return true;
    };
    if expiry.is_zero() {
        return true;
    }
    // A timestamp in the future counts as just fetched
    let elapsed = (now - fetched_at).to_std().unwrap_or(Duration::ZERO);
    elapsed > expiry
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::policy::ExpiryOverrides;
    use serde_json::json;
    use std::cell::Cell;
    use std::thread;
    use tempfile::TempDir;
    use thiserror::Error;

    const GAMES_KEY: &str = "get/games";
    const MOD_KEY: &str = "get/games/skyrimspecialedition/mods/2014";
    const OTHER_MOD_KEY: &str = "get/games/skyrimspecialedition/mods/2015";

    #[derive(Debug, Error)]
    enum TestError {
        #[error("origin failed")]
        Origin,
        #[error(transparent)]
        Policy(#[from] PolicyError),
        #[error(transparent)]
        Store(#[from] StoreError),
    }

    fn policy_with(overrides: ExpiryOverrides) -> ExpiryPolicy {
        ExpiryPolicy::with_overrides(&overrides)
    }

    fn counting_origin<'a>(
        calls: &'a Cell<u32>,
        value: Value,
    ) -> impl FnOnce() -> Result<Value, TestError> + 'a {
        move || {
            calls.set(calls.get() + 1);
            Ok(value)
        }
    }

    fn failing_origin() -> Result<Value, TestError> {
        Err(TestError::Origin)
    }

    #[test]
    fn test_second_fetch_is_served_from_cache() {
        let mut fetcher = CachedFetcher::in_memory(ExpiryPolicy::default());
        let calls = Cell::new(0);

        let first = fetcher
            .fetch(GAMES_KEY, false, counting_origin(&calls, json!(["morrowind"])))
            .expect("First fetch should succeed");
        let second = fetcher
            .fetch(GAMES_KEY, false, failing_origin)
            .expect("Second fetch should not call the origin");

        assert_eq!(calls.get(), 1);
        assert_eq!(first, second);
    }

    #[test]
    fn test_expired_entry_is_refetched() {
        let mut fetcher = CachedFetcher::in_memory(policy_with(ExpiryOverrides {
            games: Some(1),
            ..Default::default()
        }));
        let calls = Cell::new(0);

        fetcher
            .fetch(GAMES_KEY, false, counting_origin(&calls, json!([1])))
            .unwrap();
        thread::sleep(std::time::Duration::from_secs(2));
        fetcher
            .fetch(GAMES_KEY, false, counting_origin(&calls, json!([1])))
            .unwrap();

        assert_eq!(calls.get(), 2);
    }

    #[test]
    fn test_entry_older_than_expiry_is_refetched_without_waiting() {
        let mut fetcher = CachedFetcher::in_memory(ExpiryPolicy::default());
        let calls = Cell::new(0);

        fetcher
            .fetch(MOD_KEY, false, counting_origin(&calls, json!({"v": 1})))
            .unwrap();
        fetcher
            .set_freshness_timestamp(MOD_KEY, Utc::now() - chrono::Duration::days(2))
            .unwrap();
        let value = fetcher
            .fetch(MOD_KEY, false, counting_origin(&calls, json!({"v": 2})))
            .unwrap();

        assert_eq!(calls.get(), 2);
        assert_eq!(value, json!({"v": 2}));
    }

    #[test]
    fn test_bypass_forces_refetch() {
        let mut fetcher = CachedFetcher::in_memory(ExpiryPolicy::default());
        let calls = Cell::new(0);

        let first = fetcher
            .fetch(MOD_KEY, false, counting_origin(&calls, json!({"call": 1})))
            .unwrap();
        let second = fetcher
            .fetch(MOD_KEY, true, counting_origin(&calls, json!({"call": 2})))
            .unwrap();

        assert_eq!(calls.get(), 2);
        assert_eq!(first, json!({"call": 1}));
        assert_eq!(second, json!({"call": 2}));
    }

    #[test]
    fn test_zero_expiry_is_never_cached() {
        let mut fetcher = CachedFetcher::in_memory(ExpiryPolicy::default());
        let calls = Cell::new(0);

        for _ in 0..3 {
            fetcher
                .fetch(
                    "get/users/validate",
                    false,
                    counting_origin(&calls, json!({"is_premium": false})),
                )
                .unwrap();
        }

        assert_eq!(calls.get(), 3);
    }

    #[test]
    fn test_origin_error_is_propagated_and_not_cached() {
        let mut fetcher = CachedFetcher::in_memory(ExpiryPolicy::default());

        let result = fetcher.fetch(GAMES_KEY, false, failing_origin);
        assert!(matches!(result, Err(TestError::Origin)));
        assert!(!fetcher.store().exists(GAMES_KEY));
        assert!(fetcher.freshness_timestamp(GAMES_KEY).is_none());

        let calls = Cell::new(0);
        fetcher
            .fetch(GAMES_KEY, false, counting_origin(&calls, json!([])))
            .unwrap();
        assert_eq!(calls.get(), 1);
    }

    #[test]
    fn test_unknown_key_fails_before_calling_origin() {
        let mut fetcher = CachedFetcher::in_memory(ExpiryPolicy::default());
        let calls = Cell::new(0);

        let result = fetcher.fetch("get/colours", false, counting_origin(&calls, json!([])));

        assert!(matches!(
            result,
            Err(TestError::Policy(PolicyError::UnknownKey { .. }))
        ));
        assert_eq!(calls.get(), 0);
    }

    #[test]
    fn test_missing_timestamp_invalidates() {
        let mut fetcher = CachedFetcher::in_memory(ExpiryPolicy::default());
        fetcher
            .store
            .put(GAMES_KEY, json!(["stale"]), EntryContext::default());
        let calls = Cell::new(0);

        let value = fetcher
            .fetch(GAMES_KEY, false, counting_origin(&calls, json!(["fresh"])))
            .unwrap();

        assert_eq!(calls.get(), 1);
        assert_eq!(value, json!(["fresh"]));
    }

    #[test]
    fn test_bypass_leaves_other_keys_untouched() {
        let mut fetcher = CachedFetcher::in_memory(ExpiryPolicy::default());
        let calls = Cell::new(0);

        fetcher
            .fetch(MOD_KEY, false, counting_origin(&calls, json!({"id": 2014})))
            .unwrap();
        fetcher
            .fetch(OTHER_MOD_KEY, false, counting_origin(&calls, json!({"id": 2015})))
            .unwrap();
        let other_timestamp = fetcher.freshness_timestamp(OTHER_MOD_KEY);

        fetcher
            .fetch(MOD_KEY, true, counting_origin(&calls, json!({"id": 2014})))
            .unwrap();
        let other = fetcher.fetch(OTHER_MOD_KEY, false, failing_origin).unwrap();

        assert_eq!(calls.get(), 3);
        assert_eq!(other, json!({"id": 2015}));
        assert_eq!(fetcher.freshness_timestamp(OTHER_MOD_KEY), other_timestamp);
    }

    #[test]
    fn test_cache_survives_reload_from_file() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let path = temp_dir.path().join("api_cache.json");
        let calls = Cell::new(0);

        let mut fetcher =
            CachedFetcher::with_file(ExpiryPolicy::default(), path.clone()).unwrap();
        let value = fetcher
            .fetch(GAMES_KEY, false, counting_origin(&calls, json!(["morrowind"])))
            .unwrap();
        let timestamp = fetcher.freshness_timestamp(GAMES_KEY);
        assert!(path.exists(), "Cache miss should save the cache file");

        let mut reloaded = CachedFetcher::with_file(ExpiryPolicy::default(), path).unwrap();
        assert!(reloaded.store().exists(GAMES_KEY));
        assert_eq!(reloaded.store().get(GAMES_KEY), Some(&value));
        assert_eq!(reloaded.freshness_timestamp(GAMES_KEY), timestamp);

        let cached = reloaded.fetch(GAMES_KEY, false, failing_origin).unwrap();
        assert_eq!(cached, value);
    }

    #[test]
    fn test_reload_applies_new_expiry_policy() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let path = temp_dir.path().join("api_cache.json");
        let calls = Cell::new(0);

        let mut fetcher =
            CachedFetcher::with_file(ExpiryPolicy::default(), path.clone()).unwrap();
        fetcher
            .fetch(GAMES_KEY, false, counting_origin(&calls, json!([])))
            .unwrap();
        fetcher
            .set_freshness_timestamp(GAMES_KEY, Utc::now() - chrono::Duration::seconds(5))
            .unwrap();

        let short = policy_with(ExpiryOverrides {
            games: Some(1),
            ..Default::default()
        });
        let mut reloaded = CachedFetcher::with_file(short, path).unwrap();
        reloaded
            .fetch(GAMES_KEY, false, counting_origin(&calls, json!([])))
            .unwrap();

        assert_eq!(calls.get(), 2);
    }

    #[test]
    fn test_hit_does_not_write_cache_file() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let path = temp_dir.path().join("api_cache.json");
        let calls = Cell::new(0);

        let mut fetcher =
            CachedFetcher::with_file(ExpiryPolicy::default(), path.clone()).unwrap();
        fetcher
            .fetch(GAMES_KEY, false, counting_origin(&calls, json!([])))
            .unwrap();
        std::fs::remove_file(&path).unwrap();

        fetcher.fetch(GAMES_KEY, false, failing_origin).unwrap();

        assert!(!path.exists(), "A cache hit should not save the cache file");
    }

    #[test]
    fn test_failed_save_does_not_keep_fetched_value() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let blocker = temp_dir.path().join("blocker");
        let path = blocker.join("api_cache.json");
        let calls = Cell::new(0);

        let mut fetcher =
            CachedFetcher::with_file(ExpiryPolicy::default(), path.clone()).unwrap();
        // A plain file where the cache directory should be makes every save fail
        std::fs::write(&blocker, "").expect("Should write file");

        let result =
            fetcher.fetch(GAMES_KEY, false, counting_origin(&calls, json!(["morrowind"])));
        assert!(matches!(
            result,
            Err(TestError::Store(StoreError::Write { .. }))
        ));
        assert!(!fetcher.store().exists(GAMES_KEY));
        assert!(fetcher.freshness_timestamp(GAMES_KEY).is_none());

        let retry =
            fetcher.fetch(GAMES_KEY, false, counting_origin(&calls, json!(["morrowind"])));
        assert!(retry.is_err());
        assert_eq!(calls.get(), 2, "A value that was never saved must not be served");

        std::fs::remove_file(&blocker).expect("Should remove file");
        let value = fetcher
            .fetch(GAMES_KEY, false, counting_origin(&calls, json!(["morrowind"])))
            .expect("Fetch should succeed once the cache file can be written");
        assert_eq!(calls.get(), 3);
        assert_eq!(value, json!(["morrowind"]));
        assert!(path.exists());
    }

    #[test]
    fn test_timestamp_controls() {
        let mut fetcher = CachedFetcher::in_memory(ExpiryPolicy::default());
        assert!(fetcher.freshness_timestamp(MOD_KEY).is_none());

        let calls = Cell::new(0);
        let before = Utc::now();
        fetcher
            .fetch(MOD_KEY, false, counting_origin(&calls, json!({})))
            .unwrap();
        let fetched = fetcher.freshness_timestamp(MOD_KEY).expect("Should be set");
        assert!(fetched >= before);

        let forty_days_ago = Utc::now() - chrono::Duration::days(40);
        fetcher
            .set_freshness_timestamp(MOD_KEY, forty_days_ago)
            .unwrap();
        assert_eq!(fetcher.freshness_timestamp(MOD_KEY), Some(forty_days_ago));
    }

    #[test]
    fn test_clear_removes_single_entry() {
        let mut fetcher = CachedFetcher::in_memory(ExpiryPolicy::default());
        let calls = Cell::new(0);
        fetcher
            .fetch(MOD_KEY, false, counting_origin(&calls, json!({})))
            .unwrap();
        fetcher
            .fetch(GAMES_KEY, false, counting_origin(&calls, json!([])))
            .unwrap();

        fetcher.clear(MOD_KEY).unwrap();

        assert!(!fetcher.store().exists(MOD_KEY));
        assert!(fetcher.store().exists(GAMES_KEY));
    }

    #[test]
    fn test_is_expired_rules() {
        let now = Utc::now();
        let hour = Duration::from_secs(3600);

        assert!(is_expired(&EntryContext::default(), hour, now));
        assert!(is_expired(&EntryContext::fetched_at(now), Duration::ZERO, now));
        assert!(!is_expired(&EntryContext::fetched_at(now), hour, now));
        assert!(is_expired(
            &EntryContext::fetched_at(now - chrono::Duration::hours(2)),
            hour,
            now
        ));
        assert!(!is_expired(
            &EntryContext::fetched_at(now + chrono::Duration::hours(2)),
            hour,
            now
        ));
    }
}
