//! Structured logging.
//!
//! # Responsibilities
//! - Initialize the tracing subscriber
//! - Pick the log level from config, overridable with `RUST_LOG`
//!
//! # Design Decisions
//! - Uses tracing crate for structured logging
//! - JSON format for machine parsing, pretty format for terminals

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::{LogFormat, ObservabilityConfig};

/// Environment variable that turns on request body logging.
pub const DEBUG_ENV: &str = "DEBUG";

/// Whether `DEBUG` is set to a non-empty value.
pub fn debug_env_enabled() -> bool {
    std::env::var_os(DEBUG_ENV).is_some_and(|v| !v.is_empty())
}

/// Default filter directives for a level.
pub fn default_directives(level: &str) -> String {
    format!("vvproxy={level},tower_http={level}", level = level)
}

/// Install the global subscriber. Later calls are no-ops.
///
/// `debug_bodies` raises the crate's level to `debug` so logged request
/// bodies are visible.
pub fn init(config: &ObservabilityConfig, debug_bodies: bool) {
    let level = if debug_bodies { "debug" } else { config.log_level.as_str() };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| default_directives(level).into());

    let registry = tracing_subscriber::registry().with(filter);
    let result = match config.log_format {
        LogFormat::Pretty => registry.with(fmt::layer()).try_init(),
        LogFormat::Json => registry.with(fmt::layer().json()).try_init(),
    };

    if result.is_err() {
        tracing::debug!("Tracing subscriber already installed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_directives() {
        assert_eq!(default_directives("warn"), "vvproxy=warn,tower_http=warn");
    }
}
