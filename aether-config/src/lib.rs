//! Configuration loading for `AetherCore` hosts.
//!
//! A [`RuntimeConfig`] is assembled from built-in defaults, an optional TOML
//! file, and `AETHER_*` environment overrides, in that order. Call
//! [`RuntimeConfig::validate`] before handing it to the kernel.

#![warn(missing_docs, clippy::pedantic)]

mod loader;
mod schema;

use std::path::PathBuf;

use thiserror::Error;

pub use loader::{ENV_PREFIX, from_toml_str, load};
pub use schema::{BackendProvider, BackendSettings, EngineSettings, LogSettings, RuntimeConfig};

/// Result alias for configuration operations.
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Errors raised while loading or validating configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The configuration file could not be read.
    #[error("failed to read config file {path}: {source}")]
    Io {
        /// File that was requested.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The TOML document was malformed or contained unknown keys.
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    /// A field or environment variable held an unusable value.
    #[error("invalid value for `{field}`: {reason}")]
    Invalid {
        /// Dotted field path or environment variable name.
        field: String,
        /// Why the value was rejected.
        reason: String,
    },
}

impl ConfigError {
    /// Convenience constructor for [`ConfigError::Invalid`].
    #[must_use]
    pub fn invalid(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Invalid {
            field: field.into(),
            reason: reason.into(),
        }
    }
}
