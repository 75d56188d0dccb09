//! High-level NexusMods client
//!
//! [`NexusMods`] ties the API transport to the response cache: every resource
//! goes through [`CachedFetcher`], and mods and their files can be checked
//! against the updated mods feed before deciding to refetch them.

use chrono::{DateTime, Utc};
use serde_json::Value;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::api::{ApiClient, ApiError, DEFAULT_BASE_URL};
use crate::cache::{
    check_freshness, CacheKey, CachedFetcher, ChangeField, ExpiryOverrides, ExpiryPolicy,
    Freshness, PersistentStore, TrackedResource,
};
use crate::data::{ApiLimits, Game, Mod, ModFile, ModUpdates, Since, UserInfo};

/// Navigation from one domain object to related resources
///
/// Domain objects receive this as an argument instead of holding on to the
/// client, so they stay plain data.
pub trait ResourceFetcher {
    /// A game by its domain name, if it exists
    fn fetch_game(&mut self, domain_name: &str) -> Result<Option<Game>, ApiError>;

    /// Information of a mod
    fn fetch_mod(&mut self, domain_name: &str, mod_id: u64) -> Result<Mod, ApiError>;

    /// Files of a mod
    fn fetch_mod_files(&mut self, domain_name: &str, mod_id: u64)
        -> Result<Vec<ModFile>, ApiError>;
}

/// Settings of a [`NexusMods`] client
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub api_key: String,
    pub base_url: String,
    /// File the cache is persisted to; `None` keeps it in memory only
    pub cache_file: Option<PathBuf>,
    pub expiry: ExpiryOverrides,
}

impl ClientConfig {
    /// Configuration for the public API, cached in the default cache file
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
            cache_file: PersistentStore::default_file(),
            expiry: ExpiryOverrides::default(),
        }
    }
}

/// Per-call cache options for mods and their files
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FetchOptions {
    /// Always call the API, replacing the cached copy
    pub bypass: bool,
    /// Check the updated mods feed and bypass the cache if the copy is outdated
    pub check_updates: bool,
}

/// Cached NexusMods API client
#[derive(Debug)]
pub struct NexusMods {
    api: ApiClient,
    cache: CachedFetcher,
}

impl NexusMods {
    /// Create a client, loading the cache file if one is configured
    ///
    /// # Errors
    /// Returns an error when the HTTP client cannot be built or the cache
    /// file exists but is unreadable.
    pub fn new(config: ClientConfig) -> Result<Self, ApiError> {
        let policy = ExpiryPolicy::with_overrides(&config.expiry);
        let cache = match config.cache_file {
            Some(path) => {
                info!("Using API cache file {}", path.display());
                CachedFetcher::with_file(policy, path)?
            }
            None => CachedFetcher::in_memory(policy),
        };
        let api = ApiClient::with_base_url(config.api_key, config.base_url)?;

        Ok(Self { api, cache })
    }

    /// The cache file in use, if any
    pub fn cache_file(&self) -> Option<&Path> {
        self.cache.cache_file()
    }

    /// Validate the API key and return its owner
    ///
    /// # Errors
    /// Returns `ApiError::InvalidApiKey` when the API rejects the key.
    pub fn validate_user(&mut self) -> Result<UserInfo, ApiError> {
        let key = CacheKey::get("users/validate", &[]);
        let api = &self.api;
        let response = self.cache.fetch(key.as_str(), false, || {
            // The response echoes the API key, which must not reach the cache file
            api.get("users/validate", &[]).map(|mut value| {
                if let Some(object) = value.as_object_mut() {
                    object.remove("key");
                }
                value
            })
        });
        match response {
            Ok(value) => UserInfo::from_json(value),
            Err(ApiError::Status { status, .. }) => {
                debug!("API key validation failed with status {}", status);
                Err(ApiError::InvalidApiKey)
            }
            Err(err) => Err(err),
        }
    }

    /// Current rate limits; never cached
    pub fn api_limits(&self) -> Result<ApiLimits, ApiError> {
        self.api.api_limits()
    }

    /// All games
    pub fn games(&mut self, bypass: bool) -> Result<Vec<Game>, ApiError> {
        let value = self.api_get("games", &[], bypass)?;
        Game::list_from_json(value)
    }

    /// A game by its domain name, looked up in the cached games list
    pub fn game(&mut self, domain_name: &str) -> Result<Option<Game>, ApiError> {
        let games = self.games(false)?;
        Ok(games.into_iter().find(|game| game.domain_name == domain_name))
    }

    /// Information of a mod
    pub fn mod_info(
        &mut self,
        domain_name: &str,
        mod_id: u64,
        options: FetchOptions,
    ) -> Result<Mod, ApiError> {
        let bypass = self.should_bypass(domain_name, mod_id, ChangeField::Entity, options)?;
        let value = self.api_get(&mod_path(domain_name, mod_id), &[], bypass)?;
        Mod::from_json(value)
    }

    /// Files of a mod
    pub fn mod_files(
        &mut self,
        domain_name: &str,
        mod_id: u64,
        options: FetchOptions,
    ) -> Result<Vec<ModFile>, ApiError> {
        let bypass = self.should_bypass(domain_name, mod_id, ChangeField::SubList, options)?;
        let value = self.api_get(&mod_files_path(domain_name, mod_id), &[], bypass)?;
        ModFile::list_from_json(value)
    }

    /// Mods of a game updated over a period
    pub fn updated_mods(
        &mut self,
        domain_name: &str,
        since: Since,
        bypass: bool,
    ) -> Result<Vec<ModUpdates>, ApiError> {
        let value = self.api_get(
            &updated_path(domain_name),
            &[("period", since.period())],
            bypass,
        )?;
        ModUpdates::list_from_json(value, domain_name)
    }

    /// Whether the cached information of a mod is known to be current
    pub fn mod_cache_up_to_date(
        &mut self,
        domain_name: &str,
        mod_id: u64,
    ) -> Result<bool, ApiError> {
        Ok(self
            .freshness(domain_name, mod_id, ChangeField::Entity)?
            .is_fresh())
    }

    /// Whether the cached files of a mod are known to be current
    pub fn mod_files_cache_up_to_date(
        &mut self,
        domain_name: &str,
        mod_id: u64,
    ) -> Result<bool, ApiError> {
        Ok(self
            .freshness(domain_name, mod_id, ChangeField::SubList)?
            .is_fresh())
    }

    /// When the cached information of a mod was last confirmed fresh
    pub fn mod_cache_timestamp(&self, domain_name: &str, mod_id: u64) -> Option<DateTime<Utc>> {
        let key = CacheKey::get(&mod_path(domain_name, mod_id), &[]);
        self.cache.freshness_timestamp(key.as_str())
    }

    /// Override when the cached information of a mod was last confirmed fresh
    pub fn set_mod_cache_timestamp(
        &mut self,
        domain_name: &str,
        mod_id: u64,
        timestamp: DateTime<Utc>,
    ) -> Result<(), ApiError> {
        let key = CacheKey::get(&mod_path(domain_name, mod_id), &[]);
        Ok(self.cache.set_freshness_timestamp(key.as_str(), timestamp)?)
    }

    /// When the cached files of a mod were last confirmed fresh
    pub fn mod_files_cache_timestamp(
        &self,
        domain_name: &str,
        mod_id: u64,
    ) -> Option<DateTime<Utc>> {
        let key = CacheKey::get(&mod_files_path(domain_name, mod_id), &[]);
        self.cache.freshness_timestamp(key.as_str())
    }

    /// Override when the cached files of a mod were last confirmed fresh
    pub fn set_mod_files_cache_timestamp(
        &mut self,
        domain_name: &str,
        mod_id: u64,
        timestamp: DateTime<Utc>,
    ) -> Result<(), ApiError> {
        let key = CacheKey::get(&mod_files_path(domain_name, mod_id), &[]);
        Ok(self.cache.set_freshness_timestamp(key.as_str(), timestamp)?)
    }

    /// When the cached updated mods feed was fetched
    pub fn updated_mods_cache_timestamp(
        &self,
        domain_name: &str,
        since: Since,
    ) -> Option<DateTime<Utc>> {
        let key = CacheKey::get(&updated_path(domain_name), &[("period", since.period())]);
        self.cache.freshness_timestamp(key.as_str())
    }

    /// Override when the cached updated mods feed was fetched
    pub fn set_updated_mods_cache_timestamp(
        &mut self,
        domain_name: &str,
        since: Since,
        timestamp: DateTime<Utc>,
    ) -> Result<(), ApiError> {
        let key = CacheKey::get(&updated_path(domain_name), &[("period", since.period())]);
        Ok(self.cache.set_freshness_timestamp(key.as_str(), timestamp)?)
    }

    /// Cached keys with the time their value was last confirmed fresh
    pub fn cache_entries(&self) -> Vec<(String, Option<DateTime<Utc>>)> {
        self.cache
            .store()
            .keys()
            .map(|key| (key.to_string(), self.cache.freshness_timestamp(key)))
            .collect()
    }

    /// Drop every cached response, returning how many there were
    pub fn clear_cache(&mut self) -> Result<usize, ApiError> {
        let count = self.cache.store().len();
        info!("Clearing {} cached API responses", count);
        self.cache.clear_all()?;
        Ok(count)
    }

    fn api_get(
        &mut self,
        path: &str,
        params: &[(&str, &str)],
        bypass: bool,
    ) -> Result<Value, ApiError> {
        let key = CacheKey::get(path, params);
        let api = &self.api;
        self.cache
            .fetch(key.as_str(), bypass, || api.get(path, params))
    }

    fn should_bypass(
        &mut self,
        domain_name: &str,
        mod_id: u64,
        field: ChangeField,
        options: FetchOptions,
    ) -> Result<bool, ApiError> {
        if options.bypass {
            return Ok(true);
        }
        if !options.check_updates {
            return Ok(false);
        }
        let freshness = self.freshness(domain_name, mod_id, field)?;
        Ok(freshness == Freshness::NotFresh)
    }

    fn freshness(
        &mut self,
        domain_name: &str,
        mod_id: u64,
        field: ChangeField,
    ) -> Result<Freshness, ApiError> {
        let resource_path = match field {
            ChangeField::Entity => mod_path(domain_name, mod_id),
            ChangeField::SubList => mod_files_path(domain_name, mod_id),
        };
        let key = CacheKey::get(&resource_path, &[]);
        let feed_path = updated_path(domain_name);
        let feed_params = [("period", Since::OneMonth.period())];
        let feed_key = CacheKey::get(&feed_path, &feed_params);

        let resource = TrackedResource {
            key: key.as_str(),
            feed_key: feed_key.as_str(),
            item_id: mod_id,
            field,
        };
        let api = &self.api;
        check_freshness(&mut self.cache, &resource, || {
            api.get(&feed_path, &feed_params)
        })
    }
}

impl ResourceFetcher for NexusMods {
    fn fetch_game(&mut self, domain_name: &str) -> Result<Option<Game>, ApiError> {
        self.game(domain_name)
    }

    fn fetch_mod(&mut self, domain_name: &str, mod_id: u64) -> Result<Mod, ApiError> {
        self.mod_info(domain_name, mod_id, FetchOptions::default())
    }

    fn fetch_mod_files(
        &mut self,
        domain_name: &str,
        mod_id: u64,
    ) -> Result<Vec<ModFile>, ApiError> {
        self.mod_files(domain_name, mod_id, FetchOptions::default())
    }
}

fn mod_path(domain_name: &str, mod_id: u64) -> String {
    format!("games/{}/mods/{}", domain_name, mod_id)
}

fn mod_files_path(domain_name: &str, mod_id: u64) -> String {
    format!("games/{}/mods/{}/files", domain_name, mod_id)
}

fn updated_path(domain_name: &str) -> String {
    format!("games/{}/mods/updated", domain_name)
}
