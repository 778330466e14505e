//! `tracing` subscriber installation.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::filter::LevelFilter;

/// Output encoding for log lines.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human-readable single-line output.
    #[default]
    Pretty,
    /// One JSON object per event, for log shippers.
    Json,
}

impl fmt::Display for LogFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Pretty => "pretty",
            Self::Json => "json",
        })
    }
}

impl FromStr for LogFormat {
    type Err = TelemetryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pretty" | "text" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            other => Err(TelemetryError::InvalidFormat {
                format: other.to_owned(),
            }),
        }
    }
}

/// Settings consumed by [`install_subscriber`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SubscriberConfig {
    /// Default level directive, e.g. `info` or `debug`.
    pub level: String,
    /// Output encoding.
    pub format: LogFormat,
    /// Whether to print the event target (module path).
    pub with_target: bool,
}

impl Default for SubscriberConfig {
    fn default() -> Self {
        Self {
            level: "info".to_owned(),
            format: LogFormat::Pretty,
            with_target: false,
        }
    }
}

impl SubscriberConfig {
    /// Parses the configured level.
    ///
    /// # Errors
    ///
    /// Returns [`TelemetryError::InvalidLevel`] if the level is not one of
    /// `off`, `error`, `warn`, `info`, `debug`, or `trace`.
    pub fn level_filter(&self) -> Result<LevelFilter, TelemetryError> {
        self.level
            .trim()
            .parse::<LevelFilter>()
            .map_err(|_| TelemetryError::InvalidLevel {
                level: self.level.clone(),
            })
    }
}

/// Errors raised while setting up telemetry.
#[derive(Debug, Error)]
pub enum TelemetryError {
    /// Level directive could not be parsed.
    #[error("invalid log level `{level}`")]
    InvalidLevel {
        /// The rejected level.
        level: String,
    },

    /// Log format was not recognised.
    #[error("invalid log format `{format}` (expected `pretty` or `json`)")]
    InvalidFormat {
        /// The rejected format.
        format: String,
    },

    /// A global subscriber was already installed.
    #[error("tracing subscriber already installed: {reason}")]
    AlreadyInstalled {
        /// Error reported by `tracing-subscriber`.
        reason: String,
    },
}

/// Installs the global `tracing` subscriber writing to stdout.
///
/// `RUST_LOG` directives, when present, refine the configured level.
///
/// # Errors
///
/// Returns [`TelemetryError::InvalidLevel`] for an unparsable level and
/// [`TelemetryError::AlreadyInstalled`] when called a second time.
pub fn install_subscriber(config: &SubscriberConfig) -> Result<(), TelemetryError> {
    let filter = EnvFilter::builder()
        .with_default_directive(config.level_filter()?.into())
        .from_env_lossy();

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(config.with_target);

    let installed = match config.format {
        LogFormat::Json => builder
            .json()
            .flatten_event(true)
            .with_current_span(true)
            .try_init(),
        LogFormat::Pretty => builder.try_init(),
    };

    installed.map_err(|err| TelemetryError::AlreadyInstalled {
        reason: err.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_formats() {
        assert_eq!("JSON".parse::<LogFormat>().unwrap(), LogFormat::Json);
        assert_eq!("pretty".parse::<LogFormat>().unwrap(), LogFormat::Pretty);
        assert!(matches!(
            "xml".parse::<LogFormat>(),
            Err(TelemetryError::InvalidFormat { .. })
        ));
    }

    #[test]
    fn validates_levels() {
        let config = SubscriberConfig {
            level: "debug".to_owned(),
            ..SubscriberConfig::default()
        };
        assert_eq!(config.level_filter().unwrap(), LevelFilter::DEBUG);

        let config = SubscriberConfig {
            level: "loud".to_owned(),
            ..SubscriberConfig::default()
        };
        assert!(matches!(
            config.level_filter(),
            Err(TelemetryError::InvalidLevel { .. })
        ));
    }

    #[test]
    fn second_install_is_rejected() {
        let config = SubscriberConfig::default();
        let _ = install_subscriber(&config);
        assert!(matches!(
            install_subscriber(&config),
            Err(TelemetryError::AlreadyInstalled { .. })
        ));
    }

    #[test]
    fn format_round_trips_through_serde() {
        let json = serde_json::to_string(&LogFormat::Json).unwrap();
        assert_eq!(json, "\"json\"");
        let parsed: LogFormat = serde_json::from_str("\"pretty\"").unwrap();
        assert_eq!(parsed, LogFormat::Pretty);
    }
}
