//! Log output for the facility client.
//!
//! Events go to stderr so reply payloads on stdout stay machine-readable.
//! `RUST_LOG` replaces the built-in filter when set.

use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::Level;
use tracing_subscriber::{
    EnvFilter,
    fmt::{self, format::FmtSpan},
    prelude::*,
};

use crate::config::ClientConfig;

/// Crates whose events are shown by default.
const CRATES: [&str; 2] = ["facility_client", "facility_protocol"];

/// Errors that can occur during tracing initialization
#[derive(Debug, Error)]
pub enum TracingError {
    /// Failed to set global subscriber
    #[error("failed to set global tracing subscriber: {0}")]
    SetGlobalSubscriber(#[from] tracing::subscriber::SetGlobalDefaultError),

    /// Failed to parse env filter directive
    #[error("failed to parse env filter: {0}")]
    EnvFilter(#[from] tracing_subscriber::filter::ParseError),
}

/// Log line format, selected by `log_format` or `--log-format`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// One line per event.
    #[default]
    Compact,
    /// Multi-line, for reading a single call's trace.
    Pretty,
    /// JSON lines.
    Json,
}

/// What to log and how.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TracingConfig {
    pub level: Level,
    pub format: LogFormat,
    /// Adds timestamps, targets, source locations and one span per call.
    pub verbose: bool,
}

impl Default for TracingConfig {
    fn default() -> Self {
        Self {
            level: Level::WARN,
            format: LogFormat::Compact,
            verbose: false,
        }
    }
}

impl TracingConfig {
    /// Debug mode logs every call, attempt and dropped frame.
    pub fn for_client(config: &ClientConfig) -> Self {
        Self {
            level: if config.debug { Level::DEBUG } else { Level::WARN },
            format: config.log_format,
            verbose: config.debug,
        }
    }

    /// Filter directive used when `RUST_LOG` is not set.
    pub fn default_directive(&self) -> String {
        CRATES
            .iter()
            .map(|c| format!("{c}={}", self.level))
            .collect::<Vec<_>>()
            .join(",")
    }

    fn filter(&self) -> Result<EnvFilter, TracingError> {
        let filter = EnvFilter::try_from_default_env()
            .or_else(|_| EnvFilter::try_new(self.default_directive()))?;
        Ok(filter)
    }
}

/// Installs the global subscriber.
///
/// # Errors
///
/// Returns an error if a global subscriber is already set.
pub fn init_tracing(config: &TracingConfig) -> Result<(), TracingError> {
    let verbose = config.verbose;
    let span_events = if verbose {
        FmtSpan::NEW | FmtSpan::CLOSE
    } else {
        FmtSpan::NONE
    };

    let layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_file(verbose)
        .with_line_number(verbose)
        .with_target(verbose)
        .with_span_events(span_events);

    let layer = match config.format {
        LogFormat::Json => layer.json().boxed(),
        LogFormat::Pretty => layer.pretty().boxed(),
        LogFormat::Compact if verbose => layer.compact().boxed(),
        LogFormat::Compact => layer.compact().without_time().boxed(),
    };

    let subscriber = tracing_subscriber::registry()
        .with(config.filter()?)
        .with(layer);
    tracing::subscriber::set_global_default(subscriber)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quiet_by_default() {
        let config = TracingConfig::for_client(&ClientConfig::default());
        assert_eq!(config, TracingConfig::default());
        assert_eq!(
            config.default_directive(),
            "facility_client=WARN,facility_protocol=WARN"
        );
    }

    #[test]
    fn debug_mode_is_verbose() {
        let client = ClientConfig {
            debug: true,
            log_format: LogFormat::Json,
            ..ClientConfig::default()
        };
        let config = TracingConfig::for_client(&client);
        assert_eq!(config.level, Level::DEBUG);
        assert_eq!(config.format, LogFormat::Json);
        assert!(config.verbose);
        assert!(EnvFilter::try_new(config.default_directive()).is_ok());
    }

    #[test]
    fn log_format_names() {
        assert_eq!(
            LogFormat::from_str("pretty", true).unwrap(),
            LogFormat::Pretty
        );
        #[derive(Deserialize)]
        struct Wrapper {
            format: LogFormat,
        }
        let parsed: Wrapper = toml::from_str("format = \"json\"").unwrap();
        assert_eq!(parsed.format, LogFormat::Json);
    }
}
