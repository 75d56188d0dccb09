//! NexusMods CLI - Query the NexusMods API through a persistent cache
//!
//! Every command prints its result as pretty JSON on stdout.

use clap::Parser;
use serde::Serialize;
use serde_json::{json, Value};
use tracing::debug;

use nexusmods_cache::cli::{Cli, Command};
use nexusmods_cache::{logging, ApiError, NexusMods};

fn to_json<T: Serialize>(value: &T) -> Result<Value, ApiError> {
    Ok(serde_json::to_value(value)?)
}

/// Runs one subcommand against the client
fn run(nexus: &mut NexusMods, command: &Command) -> Result<Value, ApiError> {
    match command {
        Command::User => to_json(&nexus.validate_user()?),
        Command::Limits => to_json(&nexus.api_limits()?),
        Command::Games { refresh } => to_json(&nexus.games(*refresh)?),
        Command::Game { domain } => to_json(&nexus.game(domain)?),
        Command::Mod {
            domain,
            mod_id,
            cache,
        } => to_json(&nexus.mod_info(domain, *mod_id, cache.options())?),
        Command::Files {
            domain,
            mod_id,
            cache,
        } => to_json(&nexus.mod_files(domain, *mod_id, cache.options())?),
        Command::Updated {
            domain,
            since,
            refresh,
        } => to_json(&nexus.updated_mods(domain, *since, *refresh)?),
        Command::UpToDate {
            domain,
            mod_id,
            files,
        } => {
            let up_to_date = if *files {
                nexus.mod_files_cache_up_to_date(domain, *mod_id)?
            } else {
                nexus.mod_cache_up_to_date(domain, *mod_id)?
            };
            Ok(json!({ "up_to_date": up_to_date }))
        }
        Command::Timestamp {
            domain,
            mod_id,
            files,
        } => {
            let timestamp = if *files {
                nexus.mod_files_cache_timestamp(domain, *mod_id)
            } else {
                nexus.mod_cache_timestamp(domain, *mod_id)
            };
            Ok(json!({ "cache_timestamp": timestamp }))
        }
        Command::Cache => {
            let entries: serde_json::Map<String, Value> = nexus
                .cache_entries()
                .into_iter()
                .map(|(key, timestamp)| (key, json!(timestamp)))
                .collect();
            Ok(Value::Object(entries))
        }
        Command::ClearCache => {
            let cleared = nexus.clear_cache()?;
            Ok(json!({ "cleared": cleared }))
        }
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    logging::init(cli.verbose);

    let config = cli.client_config();
    let mut nexus = NexusMods::new(config)?;
    if let Some(path) = nexus.cache_file() {
        debug!("Cache file: {}", path.display());
    }

    let output = run(&mut nexus, &cli.command)?;
    println!("{}", serde_json::to_string_pretty(&output)?);

    Ok(())
}
