//! Generation backend contract and shared data structures.

use std::time::Duration;

use aether_primitives::ToolManifest;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

/// Result alias used by generation backends.
pub type BackendResult<T> = Result<T, BackendError>;

/// Error type shared by backend implementations.
#[derive(Debug, Error)]
pub enum BackendError {
    /// Backend is misconfigured or missing credentials.
    #[error("backend not configured: {reason}")]
    Configuration {
        /// Additional context for the failure.
        reason: String,
    },

    /// The supplied request was invalid for the target model.
    #[error("invalid generation request: {reason}")]
    InvalidRequest {
        /// Reason describing why the request could not be processed.
        reason: String,
    },

    /// Transport-level failures (network, protocol, etc.).
    #[error("backend transport error: {reason}")]
    Transport {
        /// Additional context about the error.
        reason: String,
    },

    /// The backend's own timeout fired before a response arrived.
    #[error("backend timed out after {after:?}")]
    Timeout {
        /// Configured timeout that elapsed.
        after: Duration,
    },

    /// The provider rejected the request due to rate limiting.
    #[error("backend rate limited (retry after {retry_after:?})")]
    RateLimited {
        /// Suggested delay before retrying.
        retry_after: Option<Duration>,
    },

    /// The provider returned a malformed response.
    #[error("backend response error: {reason}")]
    Response {
        /// Additional context about the response failure.
        reason: String,
    },
}

impl BackendError {
    /// Convenience constructor for invalid requests.
    #[must_use]
    pub fn invalid_request(reason: impl Into<String>) -> Self {
        Self::InvalidRequest {
            reason: reason.into(),
        }
    }

    /// Convenience constructor for configuration issues.
    #[must_use]
    pub fn configuration(reason: impl Into<String>) -> Self {
        Self::Configuration {
            reason: reason.into(),
        }
    }

    /// Convenience constructor for transport failures.
    #[must_use]
    pub fn transport(reason: impl Into<String>) -> Self {
        Self::Transport {
            reason: reason.into(),
        }
    }

    /// Convenience constructor for malformed responses.
    #[must_use]
    pub fn response(reason: impl Into<String>) -> Self {
        Self::Response {
            reason: reason.into(),
        }
    }
}

/// Minimal metadata describing a backend instance.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BackendMetadata {
    provider: &'static str,
    model: String,
}

impl BackendMetadata {
    /// Creates metadata for the supplied provider and model identifier.
    #[must_use]
    pub fn new(provider: &'static str, model: impl Into<String>) -> Self {
        Self {
            provider,
            model: model.into(),
        }
    }

    /// Returns the provider identifier (e.g., "ollama").
    #[must_use]
    pub const fn provider(&self) -> &'static str {
        self.provider
    }

    /// Returns the configured model name.
    #[must_use]
    pub fn model(&self) -> &str {
        &self.model
    }
}

/// Request submitted to a generation backend.
#[derive(Clone, Debug, PartialEq)]
pub struct GenerationRequest {
    system_prompt: Option<String>,
    input: String,
    tools: Vec<ToolManifest>,
}

impl GenerationRequest {
    /// Creates a request for the given user input with no directive and no tools.
    #[must_use]
    pub fn new(input: impl Into<String>) -> Self {
        Self {
            system_prompt: None,
            input: input.into(),
            tools: Vec::new(),
        }
    }

    /// Sets the system directive. Empty strings are treated as absent.
    #[must_use]
    pub fn with_system_prompt(mut self, prompt: impl Into<String>) -> Self {
        let prompt = prompt.into();
        self.system_prompt = (!prompt.is_empty()).then_some(prompt);
        self
    }

    /// Advertises the manifests of the tools the backend may call.
    #[must_use]
    pub fn with_tools(mut self, tools: Vec<ToolManifest>) -> Self {
        self.tools = tools;
        self
    }

    /// Returns the system directive if configured.
    #[must_use]
    pub fn system_prompt(&self) -> Option<&str> {
        self.system_prompt.as_deref()
    }

    /// Returns the user input.
    #[must_use]
    pub fn input(&self) -> &str {
        &self.input
    }

    /// Returns the advertised tool manifests.
    #[must_use]
    pub fn tools(&self) -> &[ToolManifest] {
        &self.tools
    }
}

/// Backend request to execute one tool.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ToolCall {
    /// Correlation identifier assigned by the backend.
    pub id: String,
    /// Target tool name.
    pub name: String,
    /// Argument payload handed to the tool verbatim.
    #[serde(default)]
    pub arguments: Value,
}

impl ToolCall {
    /// Creates a tool call.
    #[must_use]
    pub fn new(id: impl Into<String>, name: impl Into<String>, arguments: Value) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            arguments,
        }
    }
}

/// Token accounting reported by the backend. Advisory only.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenUsage {
    /// Tokens consumed by the prompt.
    pub prompt_tokens: u32,
    /// Tokens produced in the completion.
    pub completion_tokens: u32,
    /// Sum reported by the provider.
    pub total_tokens: u32,
}

impl TokenUsage {
    /// Builds usage from prompt and completion counts.
    #[must_use]
    pub const fn new(prompt_tokens: u32, completion_tokens: u32) -> Self {
        Self {
            prompt_tokens,
            completion_tokens,
            total_tokens: prompt_tokens.saturating_add(completion_tokens),
        }
    }
}

/// Response produced by a backend: text, tool calls, or both.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct GenerationResponse {
    /// Generated text; may be empty when tool calls are present.
    #[serde(default)]
    pub content: String,
    /// Tool calls in the order the backend wants them executed.
    #[serde(default)]
    pub tool_calls: Vec<ToolCall>,
    /// Token accounting.
    #[serde(default)]
    pub usage: TokenUsage,
}

impl GenerationResponse {
    /// Creates a text-only response.
    #[must_use]
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            ..Self::default()
        }
    }

    /// Appends a tool call.
    #[must_use]
    pub fn with_tool_call(mut self, call: ToolCall) -> Self {
        self.tool_calls.push(call);
        self
    }

    /// Sets the token usage.
    #[must_use]
    pub fn with_usage(mut self, usage: TokenUsage) -> Self {
        self.usage = usage;
        self
    }

    /// Returns `true` if the backend requested at least one tool.
    #[must_use]
    pub fn has_tool_calls(&self) -> bool {
        !self.tool_calls.is_empty()
    }
}

/// Trait implemented by every generation backend.
///
/// Implementations must not block indefinitely; callers impose their own
/// deadline regardless of any timeout the backend applies internally.
#[async_trait]
pub trait GenerationBackend: Send + Sync {
    /// Returns basic metadata describing the backend instance.
    fn metadata(&self) -> &BackendMetadata;

    /// Turns a request into a response, possibly containing tool calls.
    async fn generate(&self, request: GenerationRequest) -> BackendResult<GenerationResponse>;

    /// Tool-less generation returning only the text content.
    async fn generate_text(&self, system_prompt: &str, input: &str) -> BackendResult<String> {
        let request = GenerationRequest::new(input).with_system_prompt(system_prompt);
        let response = self.generate(request).await?;
        Ok(response.content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_system_prompt_is_absent() {
        let request = GenerationRequest::new("ping").with_system_prompt("");
        assert_eq!(request.system_prompt(), None);

        let request = GenerationRequest::new("ping").with_system_prompt("be brief");
        assert_eq!(request.system_prompt(), Some("be brief"));
        assert_eq!(request.input(), "ping");
    }

    #[test]
    fn usage_totals_saturate() {
        assert_eq!(TokenUsage::new(10, 20).total_tokens, 30);
        assert_eq!(TokenUsage::new(u32::MAX, 1).total_tokens, u32::MAX);
    }

    #[test]
    fn response_reports_tool_calls() {
        let response = GenerationResponse::text("hi");
        assert!(!response.has_tool_calls());

        let response = response.with_tool_call(ToolCall::new("c1", "echo", Value::Null));
        assert!(response.has_tool_calls());
        assert_eq!(response.tool_calls[0].name, "echo");
    }
}
