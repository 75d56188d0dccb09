//! Log output setup
//!
//! Logs go to stderr so they never mix with the JSON printed on stdout.
//! `RUST_LOG` takes precedence over the `-v` count.

use tracing::debug;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Default filter for a verbosity count
pub fn default_directive(verbosity: u8) -> &'static str {
    match verbosity {
        0 => "nexusmods_cache=warn",
        1 => "nexusmods_cache=info",
        2 => "nexusmods_cache=debug",
        _ => "nexusmods_cache=trace",
    }
}

/// Install the global tracing subscriber
///
/// Returns `false` and keeps the current subscriber when one is already
/// installed.
pub fn init(verbosity: u8) -> bool {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directive(verbosity)));

    match tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt::layer().with_writer(std::io::stderr).with_target(false))
        .try_init()
    {
        Ok(()) => true,
        Err(err) => {
            debug!("Keeping the installed tracing subscriber: {}", err);
            false
        }
    }
}
