//! Core shared types for the Aether kernel.

#![warn(missing_docs, clippy::pedantic)]

mod capability;
mod error;
mod ids;
mod manifest;

/// Permission tags a tool may declare.
pub use capability::{Capability, CapabilitySet};
/// Error type and result alias shared across the workspace.
pub use error::{Error, Result};
/// Caller-assigned task identifiers.
pub use ids::TaskId;
/// Declarative tool descriptions advertised to generation backends.
pub use manifest::ToolManifest;
