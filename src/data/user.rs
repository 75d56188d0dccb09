//! Owner of the API key

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::api::ApiError;

/// User returned by API key validation
///
/// The key itself is left out so it never ends up in printed output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserInfo {
    pub user_id: u64,
    pub name: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub is_premium: bool,
    #[serde(default)]
    pub is_supporter: bool,
    #[serde(default)]
    pub profile_url: Option<String>,
}

impl UserInfo {
    pub fn from_json(value: Value) -> Result<Self, ApiError> {
        Ok(serde_json::from_value(value)?)
    }
}
