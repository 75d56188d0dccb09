//! NexusMods API client
//!
//! Issues authenticated GET requests against `https://api.nexusmods.com/v1`
//! and turns status codes into typed errors. Responses are returned as raw
//! JSON so they can be stored in the cache unchanged.

use reqwest::blocking::{Client, Response};
use reqwest::header::HeaderMap;
use reqwest::StatusCode;
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, trace};

use crate::cache::{PolicyError, StoreError};
use crate::data::ApiLimits;

/// Base URL for the NexusMods API
pub const DEFAULT_BASE_URL: &str = "https://api.nexusmods.com";

/// Errors that can occur when talking to the API or its cache
#[derive(Debug, Error)]
pub enum ApiError {
    /// HTTP request failed
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// Failed to parse JSON response
    #[error("Failed to parse JSON response: {0}")]
    Parse(#[from] serde_json::Error),

    /// HTTP 429, with the rate limit headers of the response
    #[error("Exceeding limits of API calls: {0}")]
    LimitsExceeded(String),

    /// Any other non-200 status
    #[error("API {uri} returned error code {status}")]
    Status { uri: String, status: u16 },

    /// The API key was rejected during validation
    #[error("Invalid API key")]
    InvalidApiKey,

    /// Missing or malformed response header
    #[error("Missing or invalid header in response: {0}")]
    Header(String),

    #[error(transparent)]
    Policy(#[from] PolicyError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Client for the NexusMods API
#[derive(Debug, Clone)]
pub struct ApiClient {
    client: Client,
    api_key: String,
    base_url: String,
}

impl ApiClient {
    /// Create a client for the public API
    ///
    /// # Arguments
    /// * `api_key` - Personal API key sent in the `apikey` header
    pub fn new(api_key: impl Into<String>) -> Result<Self, ApiError> {
        Self::with_base_url(api_key, DEFAULT_BASE_URL)
    }

    /// Create a client against another server, used by tests and mirrors
    pub fn with_base_url(
        api_key: impl Into<String>,
        base_url: impl Into<String>,
    ) -> Result<Self, ApiError> {
        let client = Client::builder().user_agent(user_agent()).build()?;
        Ok(Self {
            client,
            api_key: api_key.into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    /// Base URL requests are sent to
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Full URI of an API path
    pub fn uri(&self, path: &str) -> String {
        format!("{}/v1/{}.json", self.base_url, path.trim_matches('/'))
    }

    /// GET a path and return its JSON body
    ///
    /// # Arguments
    /// * `path` - API path without version or extension (e.g. `games/skyrim/mods/12`)
    /// * `params` - Query parameters
    ///
    /// # Returns
    /// * `Ok(Value)` - The decoded body of a 200 response
    /// * `Err(ApiError::LimitsExceeded)` - On HTTP 429
    /// * `Err(ApiError::Status)` - On any other non-200 status
    pub fn get(&self, path: &str, params: &[(&str, &str)]) -> Result<Value, ApiError> {
        let uri = self.uri(path);
        let response = self.send(&uri, params)?;

        let text = response.text()?;
        trace!("[API body] {}", text);
        Ok(serde_json::from_str(&text)?)
    }

    /// Read the current rate limits
    ///
    /// Uses the `users/validate` endpoint, which does not count against the
    /// limits, and reads the `x-rl-*` response headers. A rejected key fails
    /// with the same errors as [`ApiClient::get`].
    pub fn api_limits(&self) -> Result<ApiLimits, ApiError> {
        let uri = self.uri("users/validate");
        let response = self.send(&uri, &[])?;
        ApiLimits::from_headers(response.headers())
    }

    fn send(&self, uri: &str, params: &[(&str, &str)]) -> Result<Response, ApiError> {
        let response = self
            .client
            .get(uri)
            .header("apikey", &self.api_key)
            .query(params)
            .send()?;
        let status = response.status();
        debug!("[API call] - GET {} {:?} => {}", uri, params, status);

        if status == StatusCode::TOO_MANY_REQUESTS {
            return Err(ApiError::LimitsExceeded(rate_limit_summary(response.headers())));
        }
        if status != StatusCode::OK {
            return Err(ApiError::Status {
                uri: uri.to_string(),
                status: status.as_u16(),
            });
        }
        Ok(response)
    }
}

fn user_agent() -> String {
    format!(
        "{}/{} ({})",
        env!("CARGO_PKG_NAME"),
        env!("CARGO_PKG_VERSION"),
        std::env::consts::OS
    )
}

fn rate_limit_summary(headers: &HeaderMap) -> String {
    let mut limits: Vec<String> = headers
        .iter()
        .filter(|(name, _)| name.as_str().starts_with("x-rl-"))
        .map(|(name, value)| format!("{}: {}", name, value.to_str().unwrap_or("?")))
        .collect();
    limits.sort();
    limits.join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;
    use reqwest::header::HeaderValue;
    use serde_json::json;

    fn client(server: &MockServer) -> ApiClient {
        ApiClient::with_base_url("key", server.base_url()).expect("Should build client")
    }

    #[test]
    fn test_get_returns_json_body() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(GET)
                .path("/v1/games/skyrimspecialedition/mods/updated.json")
                .header("apikey", "key")
                .query_param("period", "1m");
            then.status(200)
                .header("content-type", "application/json")
                .json_body(json!([{"mod_id": 266}]));
        });

        let value = client(&server)
            .get("games/skyrimspecialedition/mods/updated", &[("period", "1m")])
            .expect("Should fetch");

        mock.assert();
        assert_eq!(value, json!([{"mod_id": 266}]));
    }

    #[test]
    fn test_get_429_reports_limits() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/v1/games.json");
            then.status(429)
                .header("x-rl-hourly-remaining", "0")
                .header("x-rl-daily-remaining", "12");
        });

        let err = client(&server).get("games", &[]).unwrap_err();

        match err {
            ApiError::LimitsExceeded(limits) => {
                assert!(limits.contains("x-rl-hourly-remaining: 0"), "{}", limits);
                assert!(limits.contains("x-rl-daily-remaining: 12"), "{}", limits);
            }
            other => panic!("Expected LimitsExceeded, got {:?}", other),
        }
    }

    #[test]
    fn test_get_other_status_names_uri() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/v1/games/morrowind/mods/1.json");
            then.status(404);
        });
        let client = client(&server);

        let err = client.get("games/morrowind/mods/1", &[]).unwrap_err();

        match err {
            ApiError::Status { uri, status } => {
                assert_eq!(status, 404);
                assert_eq!(uri, client.uri("games/morrowind/mods/1"));
            }
            other => panic!("Expected Status, got {:?}", other),
        }
    }

    #[test]
    fn test_get_invalid_body_is_parse_error() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/v1/games.json");
            then.status(200).body("<html>maintenance</html>");
        });

        let err = client(&server).get("games", &[]).unwrap_err();
        assert!(matches!(err, ApiError::Parse(_)));
    }

    #[test]
    fn test_api_limits_reads_headers() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(GET)
                .path("/v1/users/validate.json")
                .header("apikey", "key");
            then.status(200)
                .header("x-rl-hourly-limit", "100")
                .header("x-rl-hourly-remaining", "97")
                .header("x-rl-hourly-reset", "2019-10-02T16:00:00+00:00")
                .header("x-rl-daily-limit", "2500")
                .header("x-rl-daily-remaining", "2497")
                .header("x-rl-daily-reset", "2019-10-03 00:00:00 +0000")
                .json_body(json!({"user_id": 1}));
        });

        let limits = client(&server).api_limits().expect("Should read limits");

        mock.assert();
        assert_eq!(limits.hourly_remaining, 97);
        assert_eq!(limits.daily_limit, 2500);
    }

    #[test]
    fn test_api_limits_rejected_key_is_status_error() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/v1/users/validate.json");
            then.status(401).json_body(json!({"message": "Please provide a valid API Key"}));
        });

        let err = client(&server).api_limits().unwrap_err();
        assert!(matches!(err, ApiError::Status { status: 401, .. }));
    }

    #[test]
    fn test_uri_formatting() {
        let client = ApiClient::with_base_url("key", "http://localhost:8080/")
            .expect("Should build client");

        assert_eq!(client.base_url(), "http://localhost:8080");
        assert_eq!(
            client.uri("games/skyrim/mods/12"),
            "http://localhost:8080/v1/games/skyrim/mods/12.json"
        );
        assert_eq!(
            client.uri("/users/validate/"),
            "http://localhost:8080/v1/users/validate.json"
        );
    }

    #[test]
    fn test_default_base_url() {
        let client = ApiClient::new("key").expect("Should build client");
        assert_eq!(client.uri("games"), "https://api.nexusmods.com/v1/games.json");
    }

    #[test]
    fn test_user_agent_names_crate() {
        let agent = user_agent();
        assert!(agent.starts_with("nexusmods-cache/"));
        assert!(agent.contains(std::env::consts::OS));
    }

    #[test]
    fn test_rate_limit_summary_only_lists_limits() {
        let mut headers = HeaderMap::new();
        headers.insert("x-rl-hourly-remaining", HeaderValue::from_static("0"));
        headers.insert("x-rl-daily-remaining", HeaderValue::from_static("12"));
        headers.insert("content-type", HeaderValue::from_static("application/json"));

        assert_eq!(
            rate_limit_summary(&headers),
            "x-rl-daily-remaining: 12, x-rl-hourly-remaining: 0"
        );
    }
}
