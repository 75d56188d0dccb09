//! Games and their mod categories

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::api::ApiError;

/// A game hosted on NexusMods
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Game {
    pub id: u64,
    pub name: String,
    pub forum_url: String,
    pub nexusmods_url: String,
    pub genre: String,
    /// Identifier used in API paths (e.g. `skyrimspecialedition`)
    pub domain_name: String,
    #[serde(with = "chrono::serde::ts_seconds")]
    pub approved_date: DateTime<Utc>,
    #[serde(rename = "file_count", default)]
    pub files_count: u64,
    #[serde(rename = "file_views", default)]
    pub files_views: u64,
    #[serde(rename = "file_endorsements", default)]
    pub files_endorsements: u64,
    #[serde(rename = "downloads", default)]
    pub downloads_count: u64,
    #[serde(rename = "authors", default)]
    pub authors_count: u64,
    #[serde(rename = "mods", default)]
    pub mods_count: u64,
    #[serde(default)]
    pub categories: Vec<Category>,
}

/// A mod category of a game
///
/// Categories form a tree through `parent_category`. A parent id that does not
/// match any category of the game happens in practice and is kept as is.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    #[serde(rename = "category_id")]
    pub id: u64,
    pub name: String,
    /// The API sends `false` for root categories
    #[serde(default, deserialize_with = "parent_category_id")]
    pub parent_category: Option<u64>,
}

fn parent_category_id<'de, D>(deserializer: D) -> Result<Option<u64>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::Number(id) => id.as_u64(),
        _ => None,
    })
}

impl Game {
    /// Maps the response of the games list
    pub fn list_from_json(value: Value) -> Result<Vec<Self>, ApiError> {
        Ok(serde_json::from_value(value)?)
    }

    /// Looks up a category of this game by id
    pub fn category(&self, id: u64) -> Option<&Category> {
        self.categories.iter().find(|category| category.id == id)
    }

    /// Parent of a category, if it has one known to this game
    pub fn parent_of(&self, category: &Category) -> Option<&Category> {
        category.parent_category.and_then(|id| self.category(id))
    }
}
