//! Tracing subscriber bootstrap for binaries and tests embedding the store.
//!
//! The library itself only emits `tracing` events; installing a subscriber
//! is left to the host.

use std::sync::OnceLock;
use tracing_subscriber::EnvFilter;

/// Environment variable read for the filter directives.
pub const LOG_ENV: &str = "NOTES_LOG";

static INSTALLED: OnceLock<()> = OnceLock::new();

/// Install a fmt subscriber filtered by `NOTES_LOG`, else `default_filter`.
///
/// Idempotent within this crate. Returns an error message, never panics,
/// when another global subscriber is already installed.
pub fn init_logging(default_filter: &str) -> Result<(), String> {
    if INSTALLED.get().is_some() {
        return Ok(());
    }

    let filter = EnvFilter::try_from_env(LOG_ENV)
        .or_else(|_| EnvFilter::try_new(default_filter))
        .map_err(|e| format!("invalid log filter `{default_filter}`: {e}"))?;

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init()
        .map_err(|e| format!("failed to install tracing subscriber: {e}"))?;

    let _ = INSTALLED.set(());
    Ok(())
}
