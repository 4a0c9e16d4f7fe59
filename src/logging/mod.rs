// Logging module for structured logging using the tracing crate

use std::error::Error;
use tracing_subscriber::EnvFilter;

use crate::config::{LogFormat, LoggingConfig};

/// Initialize the tracing subscriber for structured logging
///
/// The subscriber is configured with:
/// - JSON formatting for easy parsing by log aggregation systems
///   (or human-readable output when `format: pretty`)
/// - Filtering based on the configured level, overridable with `RUST_LOG`
/// - Output to stdout for container/cloud-native deployments
///
/// # Errors
///
/// Returns an error if the level filter is invalid or a global subscriber
/// has already been installed.
///
/// # Examples
///
/// ```no_run
/// use imgway::config::LoggingConfig;
/// use imgway::logging::init_subscriber;
///
/// init_subscriber(&LoggingConfig::default()).expect("Failed to initialize logging");
/// tracing::info!("Application started");
/// ```
pub fn init_subscriber(config: &LoggingConfig) -> Result<(), Box<dyn Error + Send + Sync>> {
    let filter = build_filter(config)?;

    match config.format {
        LogFormat::Json => tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_current_span(false)
            .try_init(),
        LogFormat::Pretty => tracing_subscriber::fmt().with_env_filter(filter).try_init(),
    }
}

/// RUST_LOG wins over the configured level when it is set and valid.
fn build_filter(config: &LoggingConfig) -> Result<EnvFilter, Box<dyn Error + Send + Sync>> {
    match EnvFilter::try_from_default_env() {
        Ok(filter) => Ok(filter),
        Err(_) => Ok(EnvFilter::try_new(config.level.to_lowercase())?),
    }
}

/// Render an error and its `source()` chain as a single diagnostic string.
///
/// This is the closest analogue to a stack trace for typed errors and is
/// logged alongside the top-level message when a request fails.
pub fn error_chain(err: &(dyn Error + 'static)) -> String {
    let mut rendered = err.to_string();
    let mut current = err.source();
    while let Some(cause) = current {
        rendered.push_str("\n  caused by: ");
        rendered.push_str(&cause.to_string());
        current = cause.source();
    }
    rendered
}
