//! Tool registration and invocation utilities.
//!
//! Tools are trusted in-process code. Each tool declares a
//! [`ToolManifest`](aether_primitives::ToolManifest) whose capabilities and
//! budgets are advertised to generation backends; the registry records them but
//! does not enforce them.

#![warn(missing_docs, clippy::pedantic)]

pub mod builtin;
pub mod context;
pub mod registry;

pub use context::{ToolContext, WorkerGauge, WorkerGuard};
pub use registry::{FnTool, Tool, ToolError, ToolHandle, ToolRegistry, ToolResult};
