//! API rate limits

use chrono::{DateTime, Utc};
use reqwest::header::HeaderMap;
use serde::{Deserialize, Serialize};

use crate::api::ApiError;

/// Remaining API calls, read from the `x-rl-*` headers of a response
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiLimits {
    pub daily_limit: u32,
    pub daily_remaining: u32,
    pub daily_reset: DateTime<Utc>,
    pub hourly_limit: u32,
    pub hourly_remaining: u32,
    pub hourly_reset: DateTime<Utc>,
}

impl ApiLimits {
    /// Read the limits from response headers
    ///
    /// # Errors
    /// Returns `ApiError::Header` when a header is missing or malformed.
    pub fn from_headers(headers: &HeaderMap) -> Result<Self, ApiError> {
        Ok(Self {
            daily_limit: count_header(headers, "x-rl-daily-limit")?,
            daily_remaining: count_header(headers, "x-rl-daily-remaining")?,
            daily_reset: time_header(headers, "x-rl-daily-reset")?,
            hourly_limit: count_header(headers, "x-rl-hourly-limit")?,
            hourly_remaining: count_header(headers, "x-rl-hourly-remaining")?,
            hourly_reset: time_header(headers, "x-rl-hourly-reset")?,
        })
    }
}

fn header<'a>(headers: &'a HeaderMap, name: &str) -> Result<&'a str, ApiError> {
    headers
        .get(name)
        .and_then(|value| value.to_str().ok())
        .ok_or_else(|| ApiError::Header(name.to_string()))
}

fn count_header(headers: &HeaderMap, name: &str) -> Result<u32, ApiError> {
    header(headers, name)?
        .trim()
        .parse()
        .map_err(|_| ApiError::Header(name.to_string()))
}

// Daily resets come as "2019-10-03 00:00:00 +0000", hourly ones as RFC 3339
fn time_header(headers: &HeaderMap, name: &str) -> Result<DateTime<Utc>, ApiError> {
    let value = header(headers, name)?.trim();
    DateTime::parse_from_rfc3339(value)
        .or_else(|_| DateTime::parse_from_str(value, "%Y-%m-%d %H:%M:%S %z"))
        .map(|time| time.with_timezone(&Utc))
        .map_err(|_| ApiError::Header(name.to_string()))
}
