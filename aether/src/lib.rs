//! Agent execution kernel.
//!
//! This crate bundles the `aether-*` crates behind feature flags. The
//! [`prelude`] pulls in what a host needs to build an engine:
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use aether::prelude::*;
//!
//! # async fn run() -> Result<(), EngineError> {
//! let registry = Arc::new(ToolRegistry::new());
//! registry.register(SysInfoTool)?;
//!
//! let mut engine = Engine::new(
//!     EngineConfig::default(),
//!     Arc::new(KeywordToolBackend::new()),
//!     registry,
//! );
//! engine.start()?;
//! engine.submit(Task::new(TaskId::random(), "What is the system info?"))?;
//!
//! if let Some(outcome) = engine.results().recv().await {
//!     println!("{}", outcome.output());
//! }
//! engine.stop().await
//! # }
//! ```

#![warn(missing_docs, clippy::pedantic)]

/// Shared primitives: capabilities, manifests, identifiers.
pub use aether_primitives as primitives;

/// Execution engine (enabled by `kernel` feature).
#[cfg(feature = "kernel")]
pub use aether_kernel as kernel;

/// Generation backends (enabled by `adapters` feature).
#[cfg(feature = "adapters")]
pub use aether_adapters as adapters;

/// Tool registry and built-in tools (enabled by `tools` feature).
#[cfg(feature = "tools")]
pub use aether_tools as tools;

/// Telemetry handle and log subscriber (enabled by `telemetry` feature).
#[cfg(feature = "telemetry")]
pub use aether_telemetry as telemetry;

/// File and environment configuration (enabled by `config` feature).
#[cfg(feature = "config")]
pub use aether_config as config;

/// Commonly used types.
pub mod prelude {
    pub use aether_primitives::{Capability, TaskId, ToolManifest};

    #[cfg(feature = "adapters")]
    pub use aether_adapters::{
        GenerationBackend, GenerationRequest, GenerationResponse, ToolCall,
        mock::{KeywordToolBackend, MockBackend},
    };

    #[cfg(feature = "tools")]
    pub use aether_tools::{
        Tool, ToolContext, ToolError, ToolRegistry, ToolResult, builtin::SysInfoTool,
    };

    #[cfg(feature = "telemetry")]
    pub use aether_telemetry::Telemetry;

    #[cfg(feature = "kernel")]
    pub use aether_kernel::{
        Engine, EngineConfig, EngineError, ResultStream, Task, TaskError, TaskOutcome,
    };
}
