//! Logging configuration for the `kbq` binary.
//!
//! The library only emits `tracing` events; installing a subscriber is left to
//! the application.

use tracing_subscriber::EnvFilter;

/// Default filter when `RUST_LOG` is not set.
const DEFAULT_FILTER: &str = "info";

/// Builds the filter from `RUST_LOG`, falling back to `default`.
pub fn env_filter(default: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default))
}

/// Initializes logging to stderr so stdout stays clean for query output.
///
/// `verbose` lowers the default level to `debug` for this crate.
pub fn init_stderr_logging(verbose: bool) {
    let default = if verbose {
        "info,keboola_query=debug"
    } else {
        DEFAULT_FILTER
    };

    // A subscriber may already be installed (e.g. by a test harness).
    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter(default))
        .with_writer(std::io::stderr)
        .try_init();
}
