//! Canonical cache keys for API requests
//!
//! A key fingerprints one cacheable request as `"<verb>/<path>"`, followed by
//! `"/<name=value&...>"` when the request carries query parameters. Parameters
//! are sorted by name so that two requests differing only in parameter order
//! share a cache entry.

use std::fmt;

/// Fingerprint of a cacheable request
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CacheKey(String);

impl CacheKey {
    /// Builds the key for a request
    ///
    /// # Arguments
    /// * `verb` - HTTP verb, stored lower-case
    /// * `path` - API path without scheme, host or version prefix (e.g. `games/skyrim/mods/2014`)
    /// * `params` - Query parameters, in any order
    pub fn new(verb: &str, path: &str, params: &[(&str, &str)]) -> Self {
        let mut key = format!("{}/{}", verb.to_lowercase(), path.trim_matches('/'));

        if !params.is_empty() {
            let mut sorted: Vec<&(&str, &str)> = params.iter().collect();
            sorted.sort();
            let query = sorted
                .iter()
                .map(|(name, value)| format!("{}={}", name, value))
                .collect::<Vec<_>>()
                .join("&");
            key.push('/');
            key.push_str(&query);
        }

        Self(key)
    }

    /// Builds the key of a GET request
    pub fn get(path: &str, params: &[(&str, &str)]) -> Self {
        Self::new("get", path, params)
    }

    /// Returns the key as stored in the cache
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for CacheKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl From<CacheKey> for String {
    fn from(key: CacheKey) -> Self {
        key.0
    }
}
