//! Feed of recently updated mods

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use crate::api::ApiError;
use crate::nexus::ResourceFetcher;

use super::{Mod, ModFile};

/// Look-back period of the updated mods feed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Since {
    #[default]
    OneDay,
    OneWeek,
    OneMonth,
}

/// A period name that the API does not support
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Unknown time stamp: {0}")]
pub struct UnknownSince(pub String);

impl Since {
    /// Value of the `period` query parameter
    pub fn period(&self) -> &'static str {
        match self {
            Self::OneDay => "1d",
            Self::OneWeek => "1w",
            Self::OneMonth => "1m",
        }
    }
}

impl fmt::Display for Since {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.period())
    }
}

impl FromStr for Since {
    type Err = UnknownSince;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "1d" | "one_day" | "day" => Ok(Self::OneDay),
            "1w" | "one_week" | "week" => Ok(Self::OneWeek),
            "1m" | "one_month" | "month" => Ok(Self::OneMonth),
            _ => Err(UnknownSince(s.to_string())),
        }
    }
}

/// One entry of the updated mods feed
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModUpdates {
    pub mod_id: u64,
    #[serde(with = "chrono::serde::ts_seconds")]
    pub latest_file_update: DateTime<Utc>,
    #[serde(with = "chrono::serde::ts_seconds")]
    pub latest_mod_activity: DateTime<Utc>,
    /// Game the feed was requested for; not part of the API response
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub domain_name: String,
}

impl ModUpdates {
    /// Maps the response of the updated mods feed of a game
    pub fn list_from_json(value: Value, domain_name: &str) -> Result<Vec<Self>, ApiError> {
        let mut updates: Vec<Self> = serde_json::from_value(value)?;
        for update in &mut updates {
            update.domain_name = domain_name.to_string();
        }
        Ok(updates)
    }

    /// Information of the updated mod
    pub fn mod_info(&self, fetcher: &mut dyn ResourceFetcher) -> Result<Mod, ApiError> {
        fetcher.fetch_mod(&self.domain_name, self.mod_id)
    }

    /// Files of the updated mod
    pub fn mod_files(&self, fetcher: &mut dyn ResourceFetcher) -> Result<Vec<ModFile>, ApiError> {
        fetcher.fetch_mod_files(&self.domain_name, self.mod_id)
    }
}
