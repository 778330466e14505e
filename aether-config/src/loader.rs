//! Configuration file and environment loading.

use std::fs;
use std::path::Path;
use std::str::FromStr;

use tracing::debug;

use crate::schema::RuntimeConfig;
use crate::{ConfigError, ConfigResult};

/// Prefix shared by every recognised environment variable.
pub const ENV_PREFIX: &str = "AETHER_";

/// Parses a TOML document. Missing sections fall back to defaults.
///
/// # Errors
///
/// Returns [`ConfigError::Parse`] for malformed TOML or unknown keys.
pub fn from_toml_str(raw: &str) -> ConfigResult<RuntimeConfig> {
    Ok(toml::from_str(raw)?)
}

/// Reads and parses a TOML configuration file.
///
/// # Errors
///
/// Returns [`ConfigError::Io`] when the file cannot be read and
/// [`ConfigError::Parse`] when its contents are invalid.
pub fn load(path: impl AsRef<Path>) -> ConfigResult<RuntimeConfig> {
    let path = path.as_ref();
    let raw = fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    debug!(path = %path.display(), "loaded configuration file");
    from_toml_str(&raw)
}

impl RuntimeConfig {
    /// Overlays `AETHER_*` variables from the process environment.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] when a variable cannot be parsed.
    pub fn apply_env(&mut self) -> ConfigResult<()> {
        self.apply_env_with(|key| std::env::var(key).ok())
    }

    /// Overlays variables resolved through `lookup`.
    ///
    /// Recognised keys: `AETHER_WORKERS`, `AETHER_QUEUE_CAPACITY`,
    /// `AETHER_TASK_DEADLINE_MS`, `AETHER_LOG_LEVEL`, `AETHER_LOG_FORMAT`,
    /// `AETHER_BACKEND`, `AETHER_MODEL`, `AETHER_BACKEND_URL`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] when a variable cannot be parsed.
    pub fn apply_env_with<F>(&mut self, lookup: F) -> ConfigResult<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str| lookup(&format!("{ENV_PREFIX}{name}"));

        if let Some(value) = var("WORKERS") {
            self.engine.workers = parse_env("AETHER_WORKERS", &value)?;
        }
        if let Some(value) = var("QUEUE_CAPACITY") {
            self.engine.queue_capacity = parse_env("AETHER_QUEUE_CAPACITY", &value)?;
        }
        if let Some(value) = var("TASK_DEADLINE_MS") {
            self.engine.task_deadline_ms = parse_env("AETHER_TASK_DEADLINE_MS", &value)?;
        }
        if let Some(value) = var("LOG_LEVEL") {
            self.log.level = value;
        }
        if let Some(value) = var("LOG_FORMAT") {
            self.log.format = value
                .parse()
                .map_err(|err: aether_telemetry::TelemetryError| {
                    ConfigError::invalid("AETHER_LOG_FORMAT", err.to_string())
                })?;
        }
        if let Some(value) = var("BACKEND") {
            self.backend.provider = value.parse()?;
        }
        if let Some(value) = var("MODEL") {
            self.backend.model = value;
        }
        if let Some(value) = var("BACKEND_URL") {
            self.backend.base_url = Some(value);
        }
        Ok(())
    }
}

fn parse_env<T>(key: &'static str, value: &str) -> ConfigResult<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    value
        .trim()
        .parse()
        .map_err(|err: T::Err| ConfigError::invalid(key, err.to_string()))
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::io::Write;

    use aether_telemetry::LogFormat;

    use super::*;
    use crate::schema::BackendProvider;

    #[test]
    fn empty_document_yields_defaults() {
        let config = from_toml_str("").unwrap();
        assert_eq!(config, RuntimeConfig::default());
        assert_eq!(config.engine.workers, 4);
        assert_eq!(config.engine.queue_capacity, 100);
        assert_eq!(config.engine.task_deadline().as_secs(), 300);
        config.validate().unwrap();
    }

    #[test]
    fn parses_partial_document() {
        let config = from_toml_str(
            r#"
            [engine]
            workers = 2

            [log]
            format = "json"

            [backend]
            provider = "ollama"
            model = "llama3.2"
            "#,
        )
        .unwrap();

        assert_eq!(config.engine.workers, 2);
        assert_eq!(config.engine.queue_capacity, 100);
        assert_eq!(config.log.format, LogFormat::Json);
        assert_eq!(config.backend.provider, BackendProvider::Ollama);
        assert_eq!(config.backend.model, "llama3.2");
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let err = from_toml_str("[engine]\nthreads = 3\n").expect_err("unknown key");
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn loads_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[engine]\nqueue_capacity = 8").unwrap();

        let config = load(file.path()).unwrap();
        assert_eq!(config.engine.queue_capacity, 8);
    }

    #[test]
    fn missing_file_reports_path() {
        let err = load("/nonexistent/aether.toml").expect_err("missing file");
        assert!(matches!(err, ConfigError::Io { path, .. } if path.ends_with("aether.toml")));
    }

    #[test]
    fn env_overrides_file_values() {
        let env: HashMap<&str, &str> = [
            ("AETHER_WORKERS", "8"),
            ("AETHER_TASK_DEADLINE_MS", "1500"),
            ("AETHER_LOG_LEVEL", "debug"),
            ("AETHER_LOG_FORMAT", "json"),
            ("AETHER_BACKEND", "ollama"),
        ]
        .into_iter()
        .collect();

        let mut config = RuntimeConfig::default();
        config
            .apply_env_with(|key| env.get(key).map(|v| (*v).to_owned()))
            .unwrap();

        assert_eq!(config.engine.workers, 8);
        assert_eq!(config.engine.task_deadline_ms, 1500);
        assert_eq!(config.log.level, "debug");
        assert_eq!(config.log.format, LogFormat::Json);
        assert_eq!(config.backend.provider, BackendProvider::Ollama);
    }

    #[test]
    fn env_parse_errors_name_the_variable() {
        let mut config = RuntimeConfig::default();
        let err = config
            .apply_env_with(|key| (key == "AETHER_WORKERS").then(|| "many".to_owned()))
            .expect_err("invalid number");
        assert!(matches!(err, ConfigError::Invalid { field, .. } if field == "AETHER_WORKERS"));
    }

    #[test]
    fn validation_rejects_zero_sizes() {
        let mut config = RuntimeConfig::default();
        config.engine.workers = 0;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::Invalid { field, .. }) if field == "engine.workers"
        ));

        let mut config = RuntimeConfig::default();
        config.log.level = "chatty".to_owned();
        assert!(matches!(
            config.validate(),
            Err(ConfigError::Invalid { field, .. }) if field == "log.level"
        ));
    }
}
