//! Process-wide logging setup.
//!
//! Installs a `tracing-subscriber` registry with an `EnvFilter` and one or two
//! formatting layers on stderr. Records emitted through the `log` facade (the
//! migration core, `may_postgres`) are bridged into the same subscriber.

use crate::config::{LogConfig, LogFormat};
use tracing_subscriber::filter::ParseError;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::{SubscriberInitExt, TryInitError};
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Debug, thiserror::Error)]
pub enum LoggingError {
    #[error("Invalid log level {level:?}: {source}")]
    InvalidLevel {
        level: String,
        #[source]
        source: ParseError,
    },
    #[error("Logging already initialised: {0}")]
    AlreadyInitialized(#[from] TryInitError),
}

/// Install the global subscriber
///
/// `RUST_LOG`, when set, takes precedence over `log.level`.
///
/// # Errors
///
/// Returns `LoggingError` if the level does not parse or a subscriber is
/// already installed.
pub fn init(config: &LogConfig) -> Result<(), LoggingError> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => build_filter(&config.level)?,
    };

    let (text, json) = layers_for(config.format);
    tracing_subscriber::registry()
        .with(filter)
        .with(text.then(|| fmt::layer().with_target(true).with_writer(std::io::stderr)))
        .with(json.then(|| {
            fmt::layer()
                .json()
                .with_current_span(true)
                .with_writer(std::io::stderr)
        }))
        .try_init()?;
    Ok(())
}

/// Parse `level` (e.g. `info`, `tasktrack=debug,warn`) into a filter
pub fn build_filter(level: &str) -> Result<EnvFilter, LoggingError> {
    EnvFilter::try_new(level).map_err(|source| LoggingError::InvalidLevel {
        level: level.to_string(),
        source,
    })
}

/// Which layers a format enables: (human-readable, JSON)
fn layers_for(format: LogFormat) -> (bool, bool) {
    match format {
        LogFormat::Text => (true, false),
        LogFormat::Json => (false, true),
        LogFormat::Dual => (true, true),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_layers_for_format() {
        assert_eq!(layers_for(LogFormat::Text), (true, false));
        assert_eq!(layers_for(LogFormat::Json), (false, true));
        assert_eq!(layers_for(LogFormat::Dual), (true, true));
    }

    #[test]
    fn test_build_filter_accepts_levels_and_directives() {
        assert!(build_filter("info").is_ok());
        assert!(build_filter("tasktrack=debug,warn").is_ok());
    }
}
