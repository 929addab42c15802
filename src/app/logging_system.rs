use super::config::{LogFormat, LogLevel};
use std::sync::OnceLock;
use thiserror::Error;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

#[derive(Error, Debug, Clone)]
pub enum LoggingError {
    #[error("Invalid log filter '{filter}': {details}")]
    InvalidFilter { filter: String, details: String },
    #[error("Failed to set global tracing subscriber: {0}")]
    InitFailed(String),
}

/// Noisy dependency targets kept at `warn` regardless of the chosen level.
const DEFAULT_DIRECTIVES: &[&str] = &[
    "hyper=warn",
    "hyper_util=warn",
    "reqwest=warn",
    "h2=warn",
    "rustls=warn",
];

pub fn build_filter_string(level: LogLevel) -> String {
    let mut parts = Vec::with_capacity(DEFAULT_DIRECTIVES.len() + 1);
    parts.push(level.as_str());
    parts.extend_from_slice(DEFAULT_DIRECTIVES);
    parts.join(",")
}

/// Installs the global subscriber once. `RUST_LOG`, when set, replaces the
/// configured level. Later calls return the first call's outcome.
pub fn setup_logging(level: LogLevel, format: LogFormat) -> Result<(), LoggingError> {
    static INIT: OnceLock<Result<(), LoggingError>> = OnceLock::new();

    INIT.get_or_init(|| {
        let filter_string = std::env::var("RUST_LOG")
            .ok()
            .filter(|value| !value.trim().is_empty())
            .unwrap_or_else(|| build_filter_string(level));

        let env_filter =
            EnvFilter::try_new(&filter_string).map_err(|e| LoggingError::InvalidFilter {
                filter: filter_string.clone(),
                details: e.to_string(),
            })?;

        let (compact, json) = match format {
            LogFormat::Compact => (
                Some(fmt::layer().with_target(true).with_level(true).compact()),
                None,
            ),
            LogFormat::Json => (None, Some(fmt::layer().json().with_current_span(false))),
        };

        tracing_subscriber::registry()
            .with(env_filter)
            .with(compact)
            .with(json)
            .try_init()
            .map_err(|e| LoggingError::InitFailed(e.to_string()))
    })
    .clone()
}
