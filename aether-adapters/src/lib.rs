//! Generation backends used by the kernel.
//!
//! [`traits`] defines the contract the engine consumes. [`mock`] provides
//! deterministic in-process backends and [`ollama`] talks to a local Ollama
//! daemon over HTTP.

#![warn(missing_docs, clippy::pedantic)]

pub mod mock;
pub mod ollama;
pub mod traits;

mod http_client;

pub use traits::{
    BackendError, BackendMetadata, BackendResult, GenerationBackend, GenerationRequest,
    GenerationResponse, TokenUsage, ToolCall,
};
