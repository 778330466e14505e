//! Strongly typed configuration schema.

use std::time::Duration;

use aether_telemetry::{LogFormat, SubscriberConfig};
use serde::{Deserialize, Serialize};

use crate::{ConfigError, ConfigResult};

/// Top-level runtime configuration.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RuntimeConfig {
    /// Worker pool settings.
    pub engine: EngineSettings,
    /// Logging settings.
    pub log: LogSettings,
    /// Generation backend selection.
    pub backend: BackendSettings,
}

impl RuntimeConfig {
    /// Rejects values the engine cannot run with.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] naming the first offending field.
    pub fn validate(&self) -> ConfigResult<()> {
        if self.engine.workers == 0 {
            return Err(ConfigError::invalid("engine.workers", "must be at least 1"));
        }
        if self.engine.queue_capacity == 0 {
            return Err(ConfigError::invalid(
                "engine.queue_capacity",
                "must be at least 1",
            ));
        }
        if self.engine.task_deadline_ms == 0 {
            return Err(ConfigError::invalid(
                "engine.task_deadline_ms",
                "must be greater than zero",
            ));
        }
        if self.backend.timeout_ms == 0 {
            return Err(ConfigError::invalid(
                "backend.timeout_ms",
                "must be greater than zero",
            ));
        }
        self.log
            .subscriber()
            .level_filter()
            .map_err(|err| ConfigError::invalid("log.level", err.to_string()))?;
        Ok(())
    }
}

/// Worker pool sizing and per-task budget.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EngineSettings {
    /// Number of concurrent workers.
    pub workers: usize,
    /// Capacity of both the task and the result queue.
    pub queue_capacity: usize,
    /// Outer deadline for one task, generation and tools combined.
    pub task_deadline_ms: u64,
}

impl EngineSettings {
    /// [`task_deadline_ms`](Self::task_deadline_ms) as a [`Duration`].
    #[must_use]
    pub const fn task_deadline(&self) -> Duration {
        Duration::from_millis(self.task_deadline_ms)
    }
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            workers: 4,
            queue_capacity: 100,
            task_deadline_ms: 5 * 60 * 1000,
        }
    }
}

/// Structured logging settings.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LogSettings {
    /// Level directive.
    pub level: String,
    /// Output encoding.
    pub format: LogFormat,
}

impl LogSettings {
    /// Converts into the telemetry crate's subscriber settings.
    #[must_use]
    pub fn subscriber(&self) -> SubscriberConfig {
        SubscriberConfig {
            level: self.level.clone(),
            format: self.format,
            with_target: false,
        }
    }
}

impl Default for LogSettings {
    fn default() -> Self {
        Self {
            level: "info".to_owned(),
            format: LogFormat::Pretty,
        }
    }
}

/// Which generation backend the host process should construct.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendProvider {
    /// Deterministic keyword-triggered mock.
    #[default]
    Mock,
    /// Local Ollama daemon.
    Ollama,
}

impl std::str::FromStr for BackendProvider {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "mock" => Ok(Self::Mock),
            "ollama" => Ok(Self::Ollama),
            other => Err(ConfigError::invalid(
                "backend.provider",
                format!("unknown provider `{other}`"),
            )),
        }
    }
}

/// Generation backend settings.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BackendSettings {
    /// Backend implementation.
    pub provider: BackendProvider,
    /// Model identifier passed to the provider.
    pub model: String,
    /// Provider base URL, if it differs from the default.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
    /// Provider-side HTTP timeout.
    pub timeout_ms: u64,
}

impl BackendSettings {
    /// [`timeout_ms`](Self::timeout_ms) as a [`Duration`].
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

impl Default for BackendSettings {
    fn default() -> Self {
        Self {
            provider: BackendProvider::Mock,
            model: "gemma2:2b".to_owned(),
            base_url: None,
            timeout_ms: 60_000,
        }
    }
}
