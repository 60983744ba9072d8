//! Shared utilities for fsec: logging setup and constant-time helpers.

#![forbid(unsafe_code)]

pub mod helpers;

pub use helpers::constant_time_eq;

use tracing_subscriber::EnvFilter;

/// Initialize tracing with sensible defaults.
///
/// Log level is controlled by the `RUST_LOG` environment variable.
/// Defaults to `info` if not set.
pub fn init_tracing() {
    init_tracing_with_default("info");
}

/// Initialize tracing with a specific default level.
///
/// Does nothing if a global subscriber is already installed.
pub fn init_tracing_with_default(default_level: &str) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .try_init();
}
