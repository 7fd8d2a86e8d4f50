// crates/rawmat-cli/src/logging.rs
// ============================================================================
// Module: CLI Logging
// Description: Tracing subscriber installation for the rawmat binary.
// Purpose: Route diagnostics to stderr in pretty or JSON form.
// Dependencies: rawmat-config, tracing-subscriber
// ============================================================================

//! ## Overview
//! `RUST_LOG` overrides the configured filter. Output always goes to stderr so
//! stdout stays machine-readable.

use rawmat_config::LogFormat;
use rawmat_config::LoggingConfig;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// Builds the env filter from `RUST_LOG` or the configured level.
pub(crate) fn build_filter(config: &LoggingConfig) -> Result<EnvFilter, String> {
    EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.level.trim()))
        .map_err(|err| format!("invalid logging.level: {err}"))
}

/// Installs the global subscriber.
///
/// # Errors
///
/// Returns a message when the filter is invalid or a subscriber is already set.
pub(crate) fn init(config: &LoggingConfig) -> Result<(), String> {
    let filter = build_filter(config)?;
    let registry = tracing_subscriber::registry().with(filter);
    let result = match config.format {
        LogFormat::Pretty => registry
            .with(tracing_subscriber::fmt::layer().with_target(true).with_writer(std::io::stderr))
            .try_init(),
        LogFormat::Json => registry
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_target(true)
                    .with_writer(std::io::stderr),
            )
            .try_init(),
    };
    result.map_err(|err| format!("failed to install logging: {err}"))
}
