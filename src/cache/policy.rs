//! Expiry rules for cached API responses
//!
//! Every cache key is classified into a [`ResourceCategory`] from its shape
//! (verb and path segments), and each category has its own expiry. A key that
//! matches no known shape is a programming error and is reported as such
//! instead of being cached with a guessed expiry.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

/// One day, in seconds
const ONE_DAY_SECS: u64 = 24 * 60 * 60;

/// Errors raised when a key cannot be classified
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PolicyError {
    /// The key shape does not match any known API resource
    #[error("Unknown API path: {key}")]
    UnknownKey { key: String },

    /// The category name is not one of the known categories
    #[error("Unknown cache category: '{0}'. Valid categories: games, mod, mod_files, mod_updates, users")]
    UnknownCategory(String),
}

/// Kinds of API resources, each with its own expiry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceCategory {
    /// The list of all games
    Games,
    /// A single mod's information
    Mod,
    /// The list of files of a mod
    ModFiles,
    /// The feed of mods updated over a period
    ModUpdates,
    /// The API key validation, also used to read API limits
    UserValidation,
}

impl ResourceCategory {
    /// Classifies a cache key
    ///
    /// # Errors
    /// Returns `PolicyError::UnknownKey` for any key shape outside the known API paths.
    pub fn of_key(key: &str) -> Result<Self, PolicyError> {
        let unknown = || PolicyError::UnknownKey {
            key: key.to_string(),
        };

        let mut parts = key.split('/');
        if parts.next() != Some("get") {
            return Err(unknown());
        }
        let segments: Vec<&str> = parts.collect();

        let category = match segments.as_slice() {
            ["games"] => Self::Games,
            ["games", domain, "mods", "updated", params]
                if !domain.is_empty() && params.starts_with("period=") =>
            {
                Self::ModUpdates
            }
            ["games", domain, "mods", id] if !domain.is_empty() && is_numeric(id) => Self::Mod,
            ["games", domain, "mods", id, "files"] if !domain.is_empty() && is_numeric(id) => {
                Self::ModFiles
            }
            ["users", "validate"] => Self::UserValidation,
            _ => return Err(unknown()),
        };
        Ok(category)
    }

    /// Name used in configuration and on the command line
    pub fn name(&self) -> &'static str {
        match self {
            Self::Games => "games",
            Self::Mod => "mod",
            Self::ModFiles => "mod_files",
            Self::ModUpdates => "mod_updates",
            Self::UserValidation => "users",
        }
    }
}

impl fmt::Display for ResourceCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ResourceCategory {
    type Err = PolicyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "games" => Ok(Self::Games),
            "mod" => Ok(Self::Mod),
            "mod_files" | "files" => Ok(Self::ModFiles),
            "mod_updates" | "updates" => Ok(Self::ModUpdates),
            "users" => Ok(Self::UserValidation),
            _ => Err(PolicyError::UnknownCategory(s.to_string())),
        }
    }
}

fn is_numeric(segment: &str) -> bool {
    !segment.is_empty() && segment.bytes().all(|b| b.is_ascii_digit())
}

/// Caller-supplied expiry overrides, in seconds
///
/// Unset categories keep their default expiry.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExpiryOverrides {
    pub games: Option<u64>,
    #[serde(rename = "mod")]
    pub mod_info: Option<u64>,
    pub mod_files: Option<u64>,
    pub mod_updates: Option<u64>,
    pub users: Option<u64>,
}

impl ExpiryOverrides {
    /// Overrides the expiry of one category
    pub fn set(&mut self, category: ResourceCategory, seconds: u64) {
        let slot = match category {
            ResourceCategory::Games => &mut self.games,
            ResourceCategory::Mod => &mut self.mod_info,
            ResourceCategory::ModFiles => &mut self.mod_files,
            ResourceCategory::ModUpdates => &mut self.mod_updates,
            ResourceCategory::UserValidation => &mut self.users,
        };
        *slot = Some(seconds);
    }
}

/// Expiry, in seconds, of each resource category
///
/// An expiry of zero means the category is never served from the cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExpiryPolicy {
    pub games: u64,
    pub mod_info: u64,
    pub mod_files: u64,
    pub mod_updates: u64,
    pub users: u64,
}

impl Default for ExpiryPolicy {
    fn default() -> Self {
        Self {
            games: ONE_DAY_SECS,
            mod_info: ONE_DAY_SECS,
            mod_files: ONE_DAY_SECS,
            mod_updates: ONE_DAY_SECS,
            // Used to read API limits, so never cached
            users: 0,
        }
    }
}

impl ExpiryPolicy {
    /// Default policy with the given overrides applied per category
    pub fn with_overrides(overrides: &ExpiryOverrides) -> Self {
        Self::default().merged_with(overrides)
    }

    /// Applies overrides on top of this policy
    pub fn merged_with(self, overrides: &ExpiryOverrides) -> Self {
        Self {
            games: overrides.games.unwrap_or(self.games),
            mod_info: overrides.mod_info.unwrap_or(self.mod_info),
            mod_files: overrides.mod_files.unwrap_or(self.mod_files),
            mod_updates: overrides.mod_updates.unwrap_or(self.mod_updates),
            users: overrides.users.unwrap_or(self.users),
        }
    }

    /// Expiry configured for a category
    pub fn expiry_for_category(&self, category: ResourceCategory) -> Duration {
        let seconds = match category {
            ResourceCategory::Games => self.games,
            ResourceCategory::Mod => self.mod_info,
            ResourceCategory::ModFiles => self.mod_files,
            ResourceCategory::ModUpdates => self.mod_updates,
            ResourceCategory::UserValidation => self.users,
        };
        Duration::from_secs(seconds)
    }

    /// Expiry of a cache key
    ///
    /// # Errors
    /// Returns `PolicyError::UnknownKey` when the key shape is not recognized.
    pub fn expiry_seconds_for(&self, key: &str) -> Result<Duration, PolicyError> {
        ResourceCategory::of_key(key).map(|category| self.expiry_for_category(category))
    }
}
