//! NexusMods API client with a persistent response cache
//!
//! The API enforces daily and hourly call limits, so every response is kept
//! in a JSON cache file and served from there until it expires. Mods and
//! their files can additionally be validated against the updated mods feed,
//! which costs one call per game instead of one per mod.

pub mod api;
pub mod cache;
pub mod cli;
pub mod data;
pub mod logging;
pub mod nexus;

pub use api::{ApiClient, ApiError};
pub use nexus::{ClientConfig, FetchOptions, NexusMods, ResourceFetcher};
