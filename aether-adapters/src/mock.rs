//! Deterministic in-process backends.
//!
//! Neither backend touches the network. They exist so the kernel can be
//! exercised end to end without a model provider.

use async_trait::async_trait;
use serde_json::json;

use crate::traits::{
    BackendMetadata, BackendResult, GenerationBackend, GenerationRequest, GenerationResponse,
    TokenUsage, ToolCall,
};

/// Phrase that makes [`KeywordToolBackend`] request the `sys_info` tool.
pub const SYSTEM_INFO_TRIGGER: &str = "system info";

/// Backend that answers every request with the same text and no tool calls.
#[derive(Debug, Clone)]
pub struct MockBackend {
    metadata: BackendMetadata,
    content: String,
}

impl MockBackend {
    /// Creates a backend that always returns `content`.
    #[must_use]
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            metadata: BackendMetadata::new("mock", "static"),
            content: content.into(),
        }
    }
}

#[async_trait]
impl GenerationBackend for MockBackend {
    fn metadata(&self) -> &BackendMetadata {
        &self.metadata
    }

    async fn generate(&self, _request: GenerationRequest) -> BackendResult<GenerationResponse> {
        Ok(GenerationResponse::text(self.content.clone()))
    }
}

/// Backend that simulates a model deciding to call a tool.
///
/// Inputs mentioning [`SYSTEM_INFO_TRIGGER`] (any case) yield empty content and
/// a single `sys_info` call with `{}` arguments. Anything else yields a fixed
/// text answer.
#[derive(Debug, Clone)]
pub struct KeywordToolBackend {
    metadata: BackendMetadata,
}

impl KeywordToolBackend {
    /// Text returned when the trigger phrase is absent.
    pub const FALLBACK: &'static str =
        "I am a mocked intelligence. I did not detect any tool triggers.";

    /// Creates the backend.
    #[must_use]
    pub fn new() -> Self {
        Self {
            metadata: BackendMetadata::new("mock", "keyword"),
        }
    }
}

impl Default for KeywordToolBackend {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl GenerationBackend for KeywordToolBackend {
    fn metadata(&self) -> &BackendMetadata {
        &self.metadata
    }

    async fn generate(&self, request: GenerationRequest) -> BackendResult<GenerationResponse> {
        if request.input().to_lowercase().contains(SYSTEM_INFO_TRIGGER) {
            return Ok(GenerationResponse::text(String::new())
                .with_tool_call(ToolCall::new("call_mock123", "sys_info", json!({})))
                .with_usage(TokenUsage::new(10, 20)));
        }

        Ok(GenerationResponse::text(Self::FALLBACK).with_usage(TokenUsage::new(5, 15)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn mock_returns_fixed_content() {
        let backend = MockBackend::new("Mock Content with Tools");
        let response = backend
            .generate(GenerationRequest::new("Input"))
            .await
            .unwrap();
        assert_eq!(response.content, "Mock Content with Tools");
        assert!(response.tool_calls.is_empty());
    }

    #[tokio::test]
    async fn keyword_backend_requests_sys_info() {
        let backend = KeywordToolBackend::new();
        let response = backend
            .generate(GenerationRequest::new("Show me SYSTEM INFO please"))
            .await
            .unwrap();

        assert!(response.content.is_empty());
        assert_eq!(response.tool_calls.len(), 1);
        assert_eq!(response.tool_calls[0].name, "sys_info");
        assert_eq!(response.tool_calls[0].arguments, json!({}));
        assert_eq!(response.usage.total_tokens, 30);
    }

    #[tokio::test]
    async fn keyword_backend_falls_back_to_text() {
        let backend = KeywordToolBackend::new();
        let text = backend.generate_text("", "hello").await.unwrap();
        assert_eq!(text, KeywordToolBackend::FALLBACK);
    }
}
