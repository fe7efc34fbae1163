//! Logging setup for the filter engine.
//!
//! The engine logs through `tracing` everywhere. Installing a subscriber is
//! optional and controlled by environment variables:
//!
//! - `SIFT_DEBUG=true|1|yes` - Enable debug logging
//! - `SIFT_LOG_LEVEL=trace|debug|info|warn|error` - Set a specific level
//! - `SIFT_LOG_FORMAT=json|pretty|compact` - Output format (default: json)
//!
//! ```rust,no_run
//! use sift_query::logging;
//!
//! // Call once at startup.
//! logging::init();
//! ```
//!
//! A `[logging]` section from `sift.toml` can be applied with
//! [`init_from_config`]. The subscriber itself needs the `tracing-subscriber`
//! feature; without it these functions only decide settings and callers are
//! expected to install their own subscriber.

use std::env;
use std::sync::Once;

use crate::config::{LogFormat, LoggingConfig};

static INIT: Once = Once::new();

/// Check if debug logging is enabled via `SIFT_DEBUG`.
#[inline]
pub fn is_debug_enabled() -> bool {
    env::var("SIFT_DEBUG")
        .map(|v| matches!(v.to_lowercase().as_str(), "true" | "1" | "yes"))
        .unwrap_or(false)
}

fn parse_level(level: &str) -> Option<&'static str> {
    match level.to_lowercase().as_str() {
        "trace" => Some("trace"),
        "debug" => Some("debug"),
        "info" => Some("info"),
        "warn" => Some("warn"),
        "error" => Some("error"),
        _ => None,
    }
}

fn fallback_level() -> &'static str {
    if is_debug_enabled() { "debug" } else { "warn" }
}

/// The configured log level.
///
/// `SIFT_LOG_LEVEL` wins; otherwise "debug" when `SIFT_DEBUG` is set and
/// "warn" when it is not.
pub fn get_log_level() -> &'static str {
    env::var("SIFT_LOG_LEVEL")
        .ok()
        .and_then(|level| parse_level(&level))
        .unwrap_or_else(fallback_level)
}

/// The configured log format from `SIFT_LOG_FORMAT`.
pub fn get_log_format() -> LogFormat {
    env::var("SIFT_LOG_FORMAT")
        .map(|f| match f.to_lowercase().as_str() {
            "pretty" => LogFormat::Pretty,
            "compact" => LogFormat::Compact,
            _ => LogFormat::Json,
        })
        .unwrap_or_default()
}

/// Initialize logging from the environment.
///
/// Does nothing unless `SIFT_DEBUG` or `SIFT_LOG_LEVEL` is set. Only the
/// first call in a process has any effect.
pub fn init() {
    if !is_debug_enabled() && env::var("SIFT_LOG_LEVEL").is_err() {
        return;
    }
    install(get_log_level(), get_log_format());
}

/// Initialize logging from a `[logging]` config section.
///
/// Environment variables still take precedence over the file.
pub fn init_from_config(config: &LoggingConfig) {
    let level = env::var("SIFT_LOG_LEVEL")
        .ok()
        .and_then(|level| parse_level(&level))
        .or_else(|| is_debug_enabled().then_some("debug"))
        .or_else(|| parse_level(&config.level))
        .unwrap_or("warn");

    let format = if env::var("SIFT_LOG_FORMAT").is_ok() {
        get_log_format()
    } else {
        config.format
    };

    install(level, format);
}

/// Initialize debug-level logging regardless of the environment.
pub fn init_debug() {
    install("debug", get_log_format());
}

#[cfg_attr(not(feature = "tracing-subscriber"), allow(unused_variables))]
fn install(level: &'static str, format: LogFormat) {
    INIT.call_once(|| {
        #[cfg(feature = "tracing-subscriber")]
        {
            use tracing_subscriber::{EnvFilter, fmt, prelude::*};

            let filter = EnvFilter::try_new(format!("sift={},sift_query={}", level, level))
                .unwrap_or_else(|_| EnvFilter::new("warn"));

            match format {
                LogFormat::Json => {
                    tracing_subscriber::registry()
                        .with(filter)
                        .with(fmt::layer().json())
                        .init();
                }
                LogFormat::Compact => {
                    tracing_subscriber::registry()
                        .with(filter)
                        .with(fmt::layer().compact())
                        .init();
                }
                LogFormat::Pretty => {
                    tracing_subscriber::registry()
                        .with(filter)
                        .with(fmt::layer().pretty())
                        .init();
                }
            }

            tracing::info!(level = level, format = format.as_str(), "Sift logging initialized");
        }
    });
}
