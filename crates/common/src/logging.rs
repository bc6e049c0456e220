//! Tracing setup.
//!
//! Logs always go to stderr: stdout is shared with the encoder and the
//! renderer bridge, whose own output is inherited on the same terminal.
//! Precedence for the filter is `RUST_LOG`, then the command-line flags, then
//! the configured level.

use tracing_subscriber::{fmt, EnvFilter};

use crate::config::LoggingConfig;

/// Filter used by `--verbose`: debug for our crates, info for dependencies.
pub const VERBOSE_FILTER: &str = "info,scenecast=debug";

/// Filter used when the configured one cannot be parsed.
const FALLBACK_FILTER: &str = "info";

/// Apply command-line overrides to the configured logging settings.
pub fn resolve_logging(config: &LoggingConfig, verbose: bool, json: bool) -> LoggingConfig {
    LoggingConfig {
        level: if verbose {
            VERBOSE_FILTER.to_string()
        } else {
            config.level.clone()
        },
        json: config.json || json,
    }
}

/// Parse a filter directive string, falling back to `info` on bad input.
///
/// The parse error is returned alongside so it can be reported once a
/// subscriber is installed.
fn parse_filter(level: &str) -> (EnvFilter, Option<String>) {
    match EnvFilter::try_new(level) {
        Ok(filter) => (filter, None),
        Err(e) => (EnvFilter::new(FALLBACK_FILTER), Some(e.to_string())),
    }
}

/// Install the global subscriber. Later calls are ignored.
pub fn init_logging(config: &LoggingConfig) {
    let (filter, parse_error) = match EnvFilter::try_from_default_env() {
        Ok(filter) => (filter, None),
        Err(_) => parse_filter(&config.level),
    };

    let builder = fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(true);
    let installed = if config.json {
        tracing::subscriber::set_global_default(builder.json().finish()).is_ok()
    } else {
        tracing::subscriber::set_global_default(builder.compact().finish()).is_ok()
    };

    if let (true, Some(error)) = (installed, parse_error) {
        tracing::warn!(
            level = %config.level,
            %error,
            "Invalid log filter; using \"{FALLBACK_FILTER}\""
        );
    }
}
