//! Log output for the catalog binaries.
//!
//! Tracing starts at `info` before configuration is read, then the filter is
//! swapped for the configured `logging.level`. An explicit `RUST_LOG` wins
//! over both.

use std::env;
use std::sync::OnceLock;

use tracing_subscriber::{EnvFilter, Registry, fmt, prelude::*, reload};

pub const DEFAULT_LEVEL: &str = "info";

const RUST_LOG: &str = "RUST_LOG";

static FILTER_HANDLE: OnceLock<reload::Handle<EnvFilter, Registry>> = OnceLock::new();

/// Installs the global subscriber. Later calls are no-ops.
pub fn init_tracing() {
    let rust_log = env::var(RUST_LOG).ok();
    let (filter, handle) = reload::Layer::new(startup_filter(rust_log.as_deref(), DEFAULT_LEVEL));
    if FILTER_HANDLE.set(handle).is_err() {
        return;
    }

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(true))
        .try_init();
}

/// Switches to the configured level unless `RUST_LOG` is set.
pub fn apply_logging_level(level: &str) {
    if env::var_os(RUST_LOG).is_some() {
        return;
    }
    let Some(handle) = FILTER_HANDLE.get() else {
        return;
    };
    match handle.reload(level_filter(level)) {
        Ok(()) => tracing::debug!(level, "Logging level applied"),
        Err(e) => tracing::warn!(level, error = %e, "Failed to apply logging level"),
    }
}

fn startup_filter(rust_log: Option<&str>, level: &str) -> EnvFilter {
    rust_log
        .and_then(|directives| EnvFilter::try_new(directives).ok())
        .unwrap_or_else(|| level_filter(level))
}

fn level_filter(level: &str) -> EnvFilter {
    EnvFilter::try_new(level).unwrap_or_else(|_| EnvFilter::new(DEFAULT_LEVEL))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rust_log_overrides_configured_level() {
        assert_eq!(startup_filter(Some("debug"), "warn").to_string(), "debug");
        assert_eq!(startup_filter(None, "warn").to_string(), "warn");
    }
}
