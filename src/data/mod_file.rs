//! Files attached to a mod

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

use crate::api::ApiError;

/// Category of a mod file, as numbered by the API
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FileCategory {
    Main,
    Patch,
    Optional,
    Old,
    Miscellaneous,
    Deleted,
    Archived,
    Unknown,
}

impl From<u64> for FileCategory {
    fn from(id: u64) -> Self {
        match id {
            1 => Self::Main,
            2 => Self::Patch,
            3 => Self::Optional,
            4 => Self::Old,
            5 => Self::Miscellaneous,
            6 => Self::Deleted,
            7 => Self::Archived,
            _ => Self::Unknown,
        }
    }
}

impl fmt::Display for FileCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Main => "main",
            Self::Patch => "patch",
            Self::Optional => "optional",
            Self::Old => "old",
            Self::Miscellaneous => "miscellaneous",
            Self::Deleted => "deleted",
            Self::Archived => "archived",
            Self::Unknown => "unknown",
        };
        f.write_str(name)
    }
}

/// A downloadable file of a mod
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModFile {
    /// `[file_id, game_id]` as sent by the API
    #[serde(rename = "id")]
    pub ids: Vec<u64>,
    pub uid: u64,
    pub file_id: u64,
    pub name: String,
    pub version: String,
    pub category_id: u64,
    #[serde(default)]
    pub category_name: Option<String>,
    pub is_primary: bool,
    #[serde(rename = "size_in_bytes", default)]
    pub size: Option<u64>,
    pub file_name: String,
    pub uploaded_time: DateTime<Utc>,
    #[serde(default)]
    pub mod_version: Option<String>,
    #[serde(default)]
    pub external_virus_scan_url: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub changelog_html: Option<String>,
    #[serde(rename = "content_preview_link", default)]
    pub content_preview_url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct FilesResponse {
    files: Vec<ModFile>,
}

impl ModFile {
    /// Maps the response of a mod files request
    pub fn list_from_json(value: Value) -> Result<Vec<Self>, ApiError> {
        let response: FilesResponse = serde_json::from_value(value)?;
        Ok(response.files)
    }

    /// Category decoded from `category_id`
    pub fn category(&self) -> FileCategory {
        FileCategory::from(self.category_id)
    }
}
