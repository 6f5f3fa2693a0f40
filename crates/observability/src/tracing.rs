//! Tracing/logging initialization.

use std::env;

use tracing_subscriber::EnvFilter;

const FORMAT_ENV: &str = "FRANOPS_LOG_FORMAT";

/// Initialize tracing for the process.
///
/// Filtering comes from `RUST_LOG` (default `info`). Output is compact
/// human-readable lines unless `FRANOPS_LOG_FORMAT=json` selects the
/// machine-parseable form used in deployments. Safe to call multiple times
/// (subsequent calls are no-ops).
pub fn init() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false);

    if env::var(FORMAT_ENV).is_ok_and(|v| v.eq_ignore_ascii_case("json")) {
        let _ = builder
            .json()
            .with_timer(tracing_subscriber::fmt::time::SystemTime)
            .try_init();
    } else {
        let _ = builder.compact().try_init();
    }
}
