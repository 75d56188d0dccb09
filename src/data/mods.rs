//! Mod information and its uploader

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::api::ApiError;
use crate::nexus::ResourceFetcher;

use super::{Game, ModFile};

/// A NexusMods user as attached to a mod
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub member_id: u64,
    pub member_group_id: u64,
    pub name: String,
    /// Only known for the uploader of a mod
    #[serde(default)]
    pub profile_url: Option<String>,
}

/// Information about a single mod
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Mod {
    pub uid: u64,
    pub mod_id: u64,
    pub game_id: u64,
    pub domain_name: String,
    pub category_id: u64,
    pub allow_rating: bool,
    pub version: String,
    pub created_time: DateTime<Utc>,
    pub updated_time: DateTime<Utc>,
    pub author: String,
    pub contains_adult_content: bool,
    pub status: String,
    pub available: bool,
    pub uploader: User,
    /// Hidden mods come without any of the descriptive fields
    pub name: Option<String>,
    pub summary: Option<String>,
    pub description: Option<String>,
    pub picture_url: Option<String>,
    pub downloads_count: u64,
    pub unique_downloads_count: u64,
    pub endorsements_count: u64,
}

#[derive(Debug, Deserialize)]
struct RawUser {
    member_id: u64,
    member_group_id: u64,
    name: String,
}

#[derive(Debug, Deserialize)]
struct RawMod {
    uid: u64,
    mod_id: u64,
    game_id: u64,
    domain_name: String,
    category_id: u64,
    allow_rating: bool,
    version: String,
    created_time: DateTime<Utc>,
    updated_time: DateTime<Utc>,
    author: String,
    contains_adult_content: bool,
    status: String,
    available: bool,
    user: RawUser,
    uploaded_users_profile_url: Option<String>,
    name: Option<String>,
    summary: Option<String>,
    description: Option<String>,
    picture_url: Option<String>,
    #[serde(default)]
    mod_downloads: u64,
    #[serde(default)]
    mod_unique_downloads: u64,
    #[serde(default)]
    endorsement_count: u64,
}

impl From<RawMod> for Mod {
    fn from(raw: RawMod) -> Self {
        Self {
            uid: raw.uid,
            mod_id: raw.mod_id,
            game_id: raw.game_id,
            domain_name: raw.domain_name,
            category_id: raw.category_id,
            allow_rating: raw.allow_rating,
            version: raw.version,
            created_time: raw.created_time,
            updated_time: raw.updated_time,
            author: raw.author,
            contains_adult_content: raw.contains_adult_content,
            status: raw.status,
            available: raw.available,
            uploader: User {
                member_id: raw.user.member_id,
                member_group_id: raw.user.member_group_id,
                name: raw.user.name,
                profile_url: raw.uploaded_users_profile_url,
            },
            name: raw.name,
            summary: raw.summary,
            description: raw.description,
            picture_url: raw.picture_url,
            downloads_count: raw.mod_downloads,
            unique_downloads_count: raw.mod_unique_downloads,
            endorsements_count: raw.endorsement_count,
        }
    }
}

impl Mod {
    /// Maps the response of a mod info request
    pub fn from_json(value: Value) -> Result<Self, ApiError> {
        let raw: RawMod = serde_json::from_value(value)?;
        Ok(raw.into())
    }

    /// Files of this mod
    pub fn files(&self, fetcher: &mut dyn ResourceFetcher) -> Result<Vec<ModFile>, ApiError> {
        fetcher.fetch_mod_files(&self.domain_name, self.mod_id)
    }

    /// Game this mod belongs to
    pub fn game(&self, fetcher: &mut dyn ResourceFetcher) -> Result<Option<Game>, ApiError> {
        fetcher.fetch_game(&self.domain_name)
    }
}
