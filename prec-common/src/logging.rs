//! Tracing subscriber initialization

use crate::{Error, Result};
use tracing_subscriber::EnvFilter;

/// Build the log filter: `RUST_LOG` wins, otherwise `level`
///
/// `level` may be a bare level (`"debug"`) or a full directive list
/// (`"prec_bundle=debug,info"`).
pub fn build_filter(level: &str) -> Result<EnvFilter> {
    match EnvFilter::try_from_default_env() {
        Ok(filter) => Ok(filter),
        Err(_) => EnvFilter::try_new(level)
            .map_err(|e| Error::Config(format!("Invalid log level {:?}: {}", level, e))),
    }
}

/// Install the global fmt subscriber writing to stderr
///
/// Fails if the level is invalid or a global subscriber is already set.
pub fn init(level: &str) -> Result<()> {
    let filter = build_filter(level)?;
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init()
        .map_err(|e| Error::Config(format!("Failed to initialize logging: {}", e)))
}
