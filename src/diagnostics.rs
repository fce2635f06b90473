//! Diagnostic output.
//!
//! Everything goes through `tracing`; the binary installs a stderr subscriber
//! filtered by `NICEFIGS_LOG` (default `info`). Library users get whatever
//! subscriber they installed, or nothing.

use std::fmt::Display;
use tracing_subscriber::EnvFilter;

/// Environment variable holding the log filter directive.
pub const LOG_ENV: &str = "NICEFIGS_LOG";

/// Install the stderr subscriber. Safe to call more than once.
pub fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new(default));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

/// Non-fatal problem the user should see (skipped overlay, removed axes, ...).
pub fn warn(msg: impl Display) {
    tracing::warn!("{}", msg);
}

/// Progress information.
pub fn info(msg: impl Display) {
    tracing::info!("{}", msg);
}

/// Format a fatal message the same way everywhere it is reported.
pub fn error_message(msg: impl Display) -> String {
    format!("ERROR: {}", msg)
}
