//! Diagnostic logging.
//!
//! Library code emits `tracing` events; the binary installs a compact
//! stderr subscriber filtered by `GUARDIAN_LOG` (default `warn`).

use tracing_subscriber::{fmt, EnvFilter};

/// Environment variable holding the filter directives.
pub const LOG_ENV: &str = "GUARDIAN_LOG";

const DEFAULT_FILTER: &str = "warn";

/// Install the global subscriber.  Calling it twice is harmless.
pub fn init() {
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    let _ = fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .compact()
        .try_init();
}
