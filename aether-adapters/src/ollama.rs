//! `Ollama` backend implementation.

use std::{fmt, time::Duration};

use aether_primitives::ToolManifest;
use async_trait::async_trait;
use hyper::Uri;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;
use uuid::Uuid;

use crate::http_client::JsonClient;
use crate::traits::{
    BackendError, BackendMetadata, BackendResult, GenerationBackend, GenerationRequest,
    GenerationResponse, TokenUsage, ToolCall,
};

/// Configuration for the `Ollama` backend.
#[derive(Clone, Debug)]
pub struct OllamaConfig {
    base_url: String,
    model: String,
    default_temperature: Option<f32>,
    timeout: Duration,
}

impl OllamaConfig {
    /// Creates a configuration for the supplied model using default settings.
    #[must_use]
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            base_url: "http://127.0.0.1:11434/".to_owned(),
            model: model.into(),
            default_temperature: None,
            timeout: Duration::from_secs(60),
        }
    }

    /// Overrides the base URL of the local Ollama daemon.
    ///
    /// # Errors
    ///
    /// Returns [`BackendError::Configuration`] if the supplied URL is invalid.
    pub fn with_base_url(mut self, base_url: impl AsRef<str>) -> BackendResult<Self> {
        let sanitized = sanitize_base_url(base_url.as_ref())?;
        self.base_url = sanitized;
        Ok(self)
    }

    /// Sets the sampling temperature sent with every request.
    #[must_use]
    pub fn with_default_temperature(mut self, temperature: f32) -> Self {
        self.default_temperature = Some(temperature);
        self
    }

    /// Sets the HTTP timeout for requests to the Ollama daemon.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// Backend that calls the local Ollama daemon's chat endpoint.
pub struct OllamaBackend {
    client: JsonClient,
    endpoint: Uri,
    metadata: BackendMetadata,
    default_temperature: Option<f32>,
}

impl fmt::Debug for OllamaBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OllamaBackend")
            .field("model", &self.metadata.model())
            .field("endpoint", &self.endpoint)
            .field("timeout", &self.client.timeout())
            .finish_non_exhaustive()
    }
}

impl OllamaBackend {
    /// Constructs a new backend from the supplied configuration.
    ///
    /// # Errors
    ///
    /// Returns [`BackendError::Configuration`] if the chat endpoint is invalid.
    pub fn new(config: OllamaConfig) -> BackendResult<Self> {
        let endpoint = format!("{}api/chat", config.base_url);
        let endpoint = endpoint.parse::<Uri>().map_err(|err| {
            BackendError::configuration(format!("invalid Ollama endpoint: {err}"))
        })?;

        Ok(Self {
            client: JsonClient::new(config.timeout),
            endpoint,
            metadata: BackendMetadata::new("ollama", config.model),
            default_temperature: config.default_temperature,
        })
    }

    fn build_request(&self, request: &GenerationRequest) -> ChatRequest {
        let mut messages = Vec::with_capacity(2);
        if let Some(system) = request.system_prompt() {
            messages.push(ChatMessage::new("system", system));
        }
        messages.push(ChatMessage::new("user", request.input()));

        ChatRequest {
            model: self.metadata.model().to_owned(),
            stream: false,
            messages,
            tools: request
                .tools()
                .iter()
                .map(ChatTool::from_manifest)
                .collect(),
            options: self.default_temperature.map(|temperature| ChatOptions {
                temperature: Some(temperature),
            }),
        }
    }
}

#[async_trait]
impl GenerationBackend for OllamaBackend {
    fn metadata(&self) -> &BackendMetadata {
        &self.metadata
    }

    async fn generate(&self, request: GenerationRequest) -> BackendResult<GenerationResponse> {
        let payload = self.build_request(&request);
        debug!(
            model = %payload.model,
            tools = payload.tools.len(),
            "sending Ollama chat request"
        );
        let response: ChatResponse = self.client.post("Ollama", &self.endpoint, &payload).await?;
        response.into_generation()
    }
}

#[derive(Debug, Serialize)]
struct ChatRequest {
    model: String,
    stream: bool,
    messages: Vec<ChatMessage>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    tools: Vec<ChatTool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    options: Option<ChatOptions>,
}

#[derive(Debug, Serialize, Deserialize)]
struct ChatMessage {
    role: String,
    #[serde(default)]
    content: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    tool_calls: Vec<ChatToolCall>,
}

impl ChatMessage {
    fn new(role: &str, content: &str) -> Self {
        Self {
            role: role.to_owned(),
            content: content.to_owned(),
            tool_calls: Vec::new(),
        }
    }
}

#[derive(Debug, Serialize)]
struct ChatTool {
    #[serde(rename = "type")]
    kind: &'static str,
    function: ChatFunction,
}

impl ChatTool {
    fn from_manifest(manifest: &ToolManifest) -> Self {
        Self {
            kind: "function",
            function: ChatFunction {
                name: manifest.name().to_owned(),
                description: manifest.description().to_owned(),
                parameters: manifest.parameters().clone(),
            },
        }
    }
}

#[derive(Debug, Serialize)]
struct ChatFunction {
    name: String,
    description: String,
    parameters: Value,
}

#[derive(Debug, Serialize, Deserialize)]
struct ChatToolCall {
    function: ChatToolCallFunction,
}

#[derive(Debug, Serialize, Deserialize)]
struct ChatToolCallFunction {
    name: String,
    #[serde(default)]
    arguments: Value,
}

#[derive(Debug, Serialize)]
struct ChatOptions {
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    message: Option<ChatMessage>,
    #[serde(default)]
    response: Option<String>,
    #[serde(default)]
    prompt_eval_count: u32,
    #[serde(default)]
    eval_count: u32,
    #[serde(default)]
    error: Option<String>,
}

impl ChatResponse {
    fn into_generation(self) -> BackendResult<GenerationResponse> {
        if let Some(error) = self.error {
            return Err(BackendError::response(error));
        }

        let usage = TokenUsage::new(self.prompt_eval_count, self.eval_count);
        let (content, calls) = match self.message {
            Some(message) => (message.content, message.tool_calls),
            None => (self.response.unwrap_or_default(), Vec::new()),
        };

        let tool_calls = calls
            .into_iter()
            .map(|call| {
                ToolCall::new(
                    format!("call_{}", Uuid::new_v4().simple()),
                    call.function.name,
                    call.function.arguments,
                )
            })
            .collect();

        Ok(GenerationResponse {
            content,
            tool_calls,
            usage,
        })
    }
}

fn sanitize_base_url(input: &str) -> BackendResult<String> {
    let mut base = input.trim().to_owned();
    if !(base.starts_with("http://") || base.starts_with("https://")) {
        return Err(BackendError::configuration(
            "Ollama base URL must start with http:// or https://",
        ));
    }
    if !base.ends_with('/') {
        base.push('/');
    }
    base.parse::<Uri>()
        .map_err(|err| BackendError::configuration(format!("invalid Ollama base URL: {err}")))?;
    Ok(base)
}

#[cfg(test)]
mod tests {
    use super::*;
    use aether_primitives::Capability;

    #[test]
    fn rejects_base_url_without_scheme() {
        let err = OllamaConfig::new("gemma")
            .with_base_url("localhost:11434")
            .expect_err("missing scheme should error");
        assert!(matches!(err, BackendError::Configuration { .. }));
    }

    #[test]
    fn sanitize_adds_trailing_slash() {
        let cfg = OllamaConfig::new("gemma")
            .with_base_url("http://localhost:11434")
            .expect("valid url");
        assert_eq!(cfg.base_url, "http://localhost:11434/");
    }

    #[tokio::test]
    async fn build_request_advertises_tools() {
        let backend = OllamaBackend::new(OllamaConfig::new("gemma").with_default_temperature(0.1))
            .expect("backend");
        let manifest = ToolManifest::new("sys_info", "host details")
            .unwrap()
            .with_capabilities([Capability::State]);
        let request = GenerationRequest::new("hello")
            .with_system_prompt("be brief")
            .with_tools(vec![manifest]);

        let chat = backend.build_request(&request);
        assert_eq!(chat.model, "gemma");
        assert_eq!(chat.messages.len(), 2);
        assert_eq!(chat.messages[0].role, "system");
        assert_eq!(chat.tools.len(), 1);
        assert!(chat.options.is_some());

        let json = serde_json::to_value(&chat).unwrap();
        assert_eq!(json["tools"][0]["type"], "function");
        assert_eq!(json["tools"][0]["function"]["name"], "sys_info");
    }

    #[test]
    fn response_maps_tool_calls() {
        let json = r#"{
            "message": {
                "role": "assistant",
                "content": "",
                "tool_calls": [
                    {"function": {"name": "sys_info", "arguments": {}}}
                ]
            },
            "prompt_eval_count": 12,
            "eval_count": 3,
            "done": true
        }"#;

        let parsed: ChatResponse = serde_json::from_str(json).unwrap();
        let response = parsed.into_generation().unwrap();
        assert!(response.content.is_empty());
        assert_eq!(response.tool_calls.len(), 1);
        assert_eq!(response.tool_calls[0].name, "sys_info");
        assert!(response.tool_calls[0].id.starts_with("call_"));
        assert_eq!(response.usage.total_tokens, 15);
    }

    #[test]
    fn response_error_field_is_surfaced() {
        let parsed: ChatResponse = serde_json::from_str(r#"{"error": "model not found"}"#).unwrap();
        let err = parsed.into_generation().expect_err("error field");
        assert!(matches!(err, BackendError::Response { reason } if reason == "model not found"));
    }

    #[test]
    fn legacy_response_field_is_used_without_message() {
        let parsed: ChatResponse = serde_json::from_str(r#"{"response": "hi"}"#).unwrap();
        assert_eq!(parsed.into_generation().unwrap().content, "hi");
    }
}
