//! Persistent key/value store backing the API cache
//!
//! Holds raw JSON responses plus a per-key context recording when the value was
//! last fetched from the API. The whole store is written to a single JSON file
//! with two top-level fields, `cache` and `context`. Persistence is explicit:
//! nothing reaches the disk until `save` is called.

use chrono::{DateTime, Utc};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info};

/// File name of the API cache inside the platform cache directory
const DEFAULT_CACHE_FILE_NAME: &str = "api_cache.json";

/// Errors raised while loading or saving the cache file
#[derive(Debug, Error)]
pub enum StoreError {
    /// The cache file exists but could not be read
    #[error("Failed to read cache file {path}: {source}")]
    Read { path: PathBuf, source: io::Error },

    /// The cache file could not be written
    #[error("Failed to write cache file {path}: {source}")]
    Write { path: PathBuf, source: io::Error },

    /// The cache file does not hold a valid cache document
    #[error("Invalid cache file {path}: {source}")]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },

    /// The in-memory cache could not be serialized
    #[error("Failed to serialize cache: {0}")]
    Serialize(#[source] serde_json::Error),
}

/// Metadata kept alongside a cached value
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntryContext {
    /// When the value was last fetched from the API
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub invalidate_time: Option<DateTime<Utc>>,
}

impl EntryContext {
    /// Context of a value fetched at the given time
    pub fn fetched_at(time: DateTime<Utc>) -> Self {
        Self {
            invalidate_time: Some(time),
        }
    }
}

/// On-disk layout of the cache file
#[derive(Debug, Default, Serialize, Deserialize)]
struct CacheDocument {
    #[serde(default)]
    cache: BTreeMap<String, Value>,
    #[serde(default)]
    context: BTreeMap<String, EntryContext>,
}

/// In-memory cache of raw API responses, durable to a single JSON file
#[derive(Debug, Clone, Default)]
pub struct PersistentStore {
    values: BTreeMap<String, Value>,
    contexts: BTreeMap<String, EntryContext>,
}

impl PersistentStore {
    /// Creates an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the default cache file path in the XDG-compliant cache directory
    ///
    /// Uses `~/.cache/nexusmods/api_cache.json` on Linux, or the equivalent
    /// platform path elsewhere. Returns `None` when no home directory is known.
    pub fn default_file() -> Option<PathBuf> {
        let project_dirs = ProjectDirs::from("", "", "nexusmods")?;
        Some(project_dirs.cache_dir().join(DEFAULT_CACHE_FILE_NAME))
    }

    /// Returns the cached value for a key, if any
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.values.get(key)
    }

    /// Stores a value and its context, replacing any previous entry
    pub fn put(&mut self, key: &str, value: Value, context: EntryContext) {
        self.values.insert(key.to_string(), value);
        self.contexts.insert(key.to_string(), context);
    }

    /// Removes the value of a key
    ///
    /// The context is left in place; orphaned contexts are dropped on `save`.
    pub fn delete(&mut self, key: &str) -> Option<Value> {
        self.values.remove(key)
    }

    /// Whether a value is stored for this key
    pub fn exists(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    /// Returns the context recorded for a key
    pub fn context(&self, key: &str) -> Option<&EntryContext> {
        self.contexts.get(key)
    }

    /// Replaces the context of a key without touching its value
    pub fn set_context(&mut self, key: &str, context: EntryContext) {
        self.contexts.insert(key.to_string(), context);
    }

    /// Keys currently holding a value
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(String::as_str)
    }

    /// Number of cached values
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Whether the store holds no value
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Drops every value and context
    pub fn clear(&mut self) {
        self.values.clear();
        self.contexts.clear();
    }

    /// Writes the store to `path`
    ///
    /// Contexts without a matching value are pruned first. The parent directory
    /// is created if missing, and the document is written to a temporary
    /// sibling file then renamed over `path`.
    pub fn save(&mut self, path: &Path) -> Result<(), StoreError> {
        let values = &self.values;
        self.contexts.retain(|key, _| values.contains_key(key));

        let document = CacheDocument {
            cache: self.values.clone(),
            context: self.contexts.clone(),
        };
        let json = serde_json::to_string(&document).map_err(StoreError::Serialize)?;

        let write_err = |source: io::Error| StoreError::Write {
            path: path.to_path_buf(),
            source,
        };
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(write_err)?;
        }
        let tmp_path = path.with_extension("json.tmp");
        fs::write(&tmp_path, json).map_err(write_err)?;
        fs::rename(&tmp_path, path).map_err(write_err)?;

        debug!(
            "Saved {} cache entries to {}",
            self.values.len(),
            path.display()
        );
        Ok(())
    }

    /// Replaces the store content with the content of `path`
    ///
    /// A missing file is not an error: the store is simply emptied.
    pub fn load(&mut self, path: &Path) -> Result<(), StoreError> {
        let content = match fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                debug!("No cache file at {}, starting empty", path.display());
                self.clear();
                return Ok(());
            }
            Err(source) => {
                return Err(StoreError::Read {
                    path: path.to_path_buf(),
                    source,
                })
            }
        };

        let document: CacheDocument =
            serde_json::from_str(&content).map_err(|source| StoreError::Parse {
                path: path.to_path_buf(),
                source,
            })?;
        self.values = document.cache;
        self.contexts = document.context;

        info!(
            "Loaded {} cache entries from {}",
            self.values.len(),
            path.display()
        );
        Ok(())
    }
}
