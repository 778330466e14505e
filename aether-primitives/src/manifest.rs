//! Declarative tool descriptions advertised to generation backends.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use crate::capability::{Capability, CapabilitySet};
use crate::error::{Error, Result};

const MAX_NAME_LEN: usize = 64;

/// Capability envelope and schema describing a single tool.
///
/// The parameter schema is an opaque JSON document passed through to the
/// generation backend. Runtime and memory budgets are declared intent only.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ToolManifest {
    name: String,
    description: String,
    #[serde(default = "empty_object_schema")]
    parameters: Value,
    #[serde(default)]
    capabilities: CapabilitySet,
    #[serde(default)]
    max_runtime_ms: u64,
    #[serde(default)]
    memory_limit_mb: u32,
}

fn empty_object_schema() -> Value {
    json!({ "type": "object", "properties": {} })
}

impl ToolManifest {
    /// Creates a manifest with an empty object schema, no capabilities and no
    /// declared budgets.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidManifest`] if the name is blank, too long, or
    /// contains whitespace.
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Result<Self> {
        let manifest = Self {
            name: name.into(),
            description: description.into(),
            parameters: empty_object_schema(),
            capabilities: CapabilitySet::new(),
            max_runtime_ms: 0,
            memory_limit_mb: 0,
        };
        manifest.validate()?;
        Ok(manifest)
    }

    /// Replaces the parameter schema.
    #[must_use]
    pub fn with_parameters(mut self, parameters: Value) -> Self {
        self.parameters = parameters;
        self
    }

    /// Replaces the declared capability set.
    #[must_use]
    pub fn with_capabilities(mut self, capabilities: impl IntoIterator<Item = Capability>) -> Self {
        self.capabilities = capabilities.into_iter().collect();
        self
    }

    /// Sets the declared runtime budget in milliseconds.
    #[must_use]
    pub fn with_max_runtime_ms(mut self, max_runtime_ms: u64) -> Self {
        self.max_runtime_ms = max_runtime_ms;
        self
    }

    /// Sets the declared memory budget in megabytes.
    #[must_use]
    pub fn with_memory_limit_mb(mut self, memory_limit_mb: u32) -> Self {
        self.memory_limit_mb = memory_limit_mb;
        self
    }

    /// Checks the invariants that [`ToolManifest::new`] enforces. Useful for
    /// manifests obtained through deserialization.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidManifest`] when the name is unusable as a
    /// registry key.
    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(Error::InvalidManifest {
                reason: "tool name cannot be empty".into(),
            });
        }
        if self.name.len() > MAX_NAME_LEN {
            return Err(Error::InvalidManifest {
                reason: format!("tool name length must be <= {MAX_NAME_LEN}"),
            });
        }
        if self.name.chars().any(char::is_whitespace) {
            return Err(Error::InvalidManifest {
                reason: format!("tool name `{}` cannot contain whitespace", self.name),
            });
        }
        Ok(())
    }

    /// Returns the unique tool name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the human-readable description.
    #[must_use]
    pub fn description(&self) -> &str {
        &self.description
    }

    /// Returns the parameter schema.
    #[must_use]
    pub fn parameters(&self) -> &Value {
        &self.parameters
    }

    /// Returns the declared capabilities.
    #[must_use]
    pub fn capabilities(&self) -> &CapabilitySet {
        &self.capabilities
    }

    /// Returns `true` if the tool declares the given capability.
    #[must_use]
    pub fn requires(&self, capability: Capability) -> bool {
        self.capabilities.contains(&capability)
    }

    /// Returns the declared runtime budget in milliseconds.
    #[must_use]
    pub const fn max_runtime_ms(&self) -> u64 {
        self.max_runtime_ms
    }

    /// Returns the declared runtime budget.
    #[must_use]
    pub const fn max_runtime(&self) -> Duration {
        Duration::from_millis(self.max_runtime_ms)
    }

    /// Returns the declared memory budget in megabytes.
    #[must_use]
    pub const fn memory_limit_mb(&self) -> u32 {
        self.memory_limit_mb
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_manifest() {
        let manifest = ToolManifest::new("sys_info", "host telemetry")
            .unwrap()
            .with_capabilities([Capability::State, Capability::State])
            .with_max_runtime_ms(100)
            .with_memory_limit_mb(2);

        assert_eq!(manifest.name(), "sys_info");
        assert_eq!(manifest.capabilities().len(), 1);
        assert!(manifest.requires(Capability::State));
        assert!(!manifest.requires(Capability::Network));
        assert_eq!(manifest.max_runtime(), Duration::from_millis(100));
        assert_eq!(manifest.parameters()["type"], "object");
    }

    #[test]
    fn name_is_required() {
        let err = ToolManifest::new("  ", "blank").expect_err("blank name");
        assert!(matches!(err, Error::InvalidManifest { .. }));

        let err = ToolManifest::new("two words", "spaced").expect_err("whitespace");
        assert!(matches!(err, Error::InvalidManifest { .. }));
    }

    #[test]
    fn deserializes_with_defaults() {
        let manifest: ToolManifest = serde_json::from_value(json!({
            "name": "echo",
            "description": "echo input",
        }))
        .unwrap();

        assert!(manifest.capabilities().is_empty());
        assert_eq!(manifest.max_runtime_ms(), 0);
        assert_eq!(manifest.parameters(), &empty_object_schema());
        manifest.validate().unwrap();
    }
}
