//! Command-line interface parsing for the NexusMods client
//!
//! Global options configure the client (API key, cache file, expiry
//! overrides); each subcommand maps to one cached API resource.

use clap::{ArgAction, Args, Parser, Subcommand};
use std::path::PathBuf;
use thiserror::Error;

use crate::cache::ResourceCategory;
use crate::data::{Since, UnknownSince};
use crate::nexus::{ClientConfig, FetchOptions};

/// Error types for CLI argument parsing
#[derive(Debug, Error)]
pub enum CliError {
    /// An `--expiry` value is not `CATEGORY=SECONDS`
    #[error(
        "Invalid expiry: '{0}'. Expected CATEGORY=SECONDS with CATEGORY one of games, mod, mod_files, mod_updates, users"
    )]
    InvalidExpiry(String),

    /// A `--since` value is not a supported period
    #[error(transparent)]
    UnknownSince(#[from] UnknownSince),
}

/// NexusMods API client with a persistent response cache
#[derive(Parser, Debug)]
#[command(name = "nexusmods")]
#[command(about = "Query the NexusMods API through a persistent response cache")]
#[command(version)]
pub struct Cli {
    /// Personal NexusMods API key
    #[arg(long, env = "NEXUS_MODS_API_KEY", hide_env_values = true)]
    pub api_key: String,

    /// Cache file to use instead of the default one
    #[arg(long, value_name = "FILE")]
    pub cache_file: Option<PathBuf>,

    /// Keep the cache in memory only
    #[arg(long, conflicts_with = "cache_file")]
    pub no_cache_file: bool,

    /// Override the expiry of a resource category, in seconds
    ///
    /// Examples:
    ///   --expiry mod=3600        # Refetch mods after an hour
    ///   --expiry games=0         # Never serve the games list from cache
    ///
    /// Categories: games, mod, mod_files, mod_updates, users
    #[arg(long = "expiry", value_name = "CATEGORY=SECONDS", value_parser = parse_expiry_arg)]
    pub expiries: Vec<(ResourceCategory, u64)>,

    /// Increase log verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = ArgAction::Count)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

/// Cache flags shared by mod resources
#[derive(Args, Debug, Clone, Copy, Default)]
pub struct CacheArgs {
    /// Ignore the cached copy and call the API
    #[arg(long)]
    pub refresh: bool,

    /// Check the updated mods feed and refetch only if the mod changed
    #[arg(long, conflicts_with = "refresh")]
    pub check_updates: bool,
}

impl CacheArgs {
    pub fn options(&self) -> FetchOptions {
        FetchOptions {
            bypass: self.refresh,
            check_updates: self.check_updates,
        }
    }
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Validate the API key and show its owner
    User,

    /// Show the remaining API calls
    Limits,

    /// List all games
    Games {
        /// Ignore the cached copy and call the API
        #[arg(long)]
        refresh: bool,
    },

    /// Show one game
    Game { domain: String },

    /// Show a mod
    Mod {
        domain: String,
        mod_id: u64,
        #[command(flatten)]
        cache: CacheArgs,
    },

    /// List the files of a mod
    Files {
        domain: String,
        mod_id: u64,
        #[command(flatten)]
        cache: CacheArgs,
    },

    /// List the mods of a game updated over a period
    Updated {
        domain: String,

        /// Period to look back: 1d, 1w or 1m
        #[arg(long, default_value = "1d", value_parser = parse_since_arg)]
        since: Since,

        /// Ignore the cached copy and call the API
        #[arg(long)]
        refresh: bool,
    },

    /// Check whether the cached copy of a mod is still current
    UpToDate {
        domain: String,
        mod_id: u64,

        /// Check the mod's files instead of its information
        #[arg(long)]
        files: bool,
    },

    /// Show when the cached copy of a mod was last confirmed fresh
    Timestamp {
        domain: String,
        mod_id: u64,

        /// Show the timestamp of the mod's files instead
        #[arg(long)]
        files: bool,
    },

    /// List cached responses and when they were last confirmed fresh
    Cache,

    /// Delete every cached response
    ClearCache,
}

/// Parses an `--expiry` argument
///
/// # Arguments
/// * `s` - The `CATEGORY=SECONDS` string from CLI
///
/// # Returns
/// * `Ok((ResourceCategory, u64))` if both parts are valid
/// * `Err(CliError::InvalidExpiry)` otherwise
pub fn parse_expiry_arg(s: &str) -> Result<(ResourceCategory, u64), CliError> {
    let invalid = || CliError::InvalidExpiry(s.to_string());

    let (category, seconds) = s.split_once('=').ok_or_else(invalid)?;
    let category: ResourceCategory = category.trim().parse().map_err(|_| invalid())?;
    let seconds: u64 = seconds.trim().parse().map_err(|_| invalid())?;
    Ok((category, seconds))
}

/// Parses a `--since` argument
pub fn parse_since_arg(s: &str) -> Result<Since, CliError> {
    Ok(s.parse()?)
}

impl Cli {
    /// Client configuration derived from the global options
    pub fn client_config(&self) -> ClientConfig {
        let mut config = ClientConfig::new(self.api_key.clone());
        if self.no_cache_file {
            config.cache_file = None;
        } else if let Some(path) = &self.cache_file {
            config.cache_file = Some(path.clone());
        }
        for (category, seconds) in &self.expiries {
            config.expiry.set(*category, *seconds);
        }
        config
    }
}
