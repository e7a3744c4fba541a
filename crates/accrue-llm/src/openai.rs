//! OpenAI-compatible Provider Implementation
//!
//! Talks to any endpoint that implements the `/chat/completions` API with
//! function tools: OpenAI itself, DeepSeek, Alibaba DashScope compatible
//! mode, local gateways.
//!
//! # Features
//!
//! - Async HTTP communication via `reqwest`
//! - Per-model default completion budgets
//! - Retry with exponential backoff on transport errors and rate limits
//!
//! # Examples
//!
//! ```no_run
//! use accrue_llm::{OpenAiProvider, ProviderSettings};
//!
//! let settings = ProviderSettings {
//!     api_key: std::env::var("OPENAI_API_KEY").unwrap_or_default(),
//!     ..ProviderSettings::new(accrue_llm::openai::OPENAI_BASE_URL, "gpt-4o-mini")
//! };
//! let provider = OpenAiProvider::new(settings);
//! ```

use crate::{validate_tools, LlmError};
use accrue_domain::{ChatModel, Message, Role, ToolCall, ToolSchema};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::time::Duration;
use tracing::{debug, warn};

/// OpenAI API base URL
pub const OPENAI_BASE_URL: &str = "https://api.openai.com/v1";

/// DeepSeek API base URL
pub const DEEPSEEK_BASE_URL: &str = "https://api.deepseek.com/v1";

/// Alibaba DashScope international, OpenAI-compatible mode
pub const DASHSCOPE_INTL_BASE_URL: &str = "https://dashscope-intl.aliyuncs.com/compatible-mode/v1";

/// Alibaba DashScope mainland China, OpenAI-compatible mode
pub const DASHSCOPE_CN_BASE_URL: &str = "https://dashscope.aliyuncs.com/compatible-mode/v1";

/// Default timeout for a single request
pub const DEFAULT_TIMEOUT_SECS: u64 = 120;

/// Default number of attempts per request
pub const DEFAULT_MAX_RETRIES: u32 = 3;

/// Default sampling temperature
pub const DEFAULT_TEMPERATURE: f32 = 0.7;

/// Upper bound on the pause between two attempts
pub const MAX_RETRY_DELAY: Duration = Duration::from_secs(30);

const MAX_TOKENS_32K: u32 = 32_768;
const MAX_TOKENS_64K: u32 = 65_536;

/// Completion budget for known models, 32k for everything else
pub fn default_max_tokens(model: &str) -> u32 {
    match model {
        "qwen3-max"
        | "qwen3-coder-plus"
        | "qwen3-coder-30b-a3b-instruct"
        | "qwen3-coder-480b-a35b-instruct" => MAX_TOKENS_64K,
        _ => MAX_TOKENS_32K,
    }
}

/// Connection and sampling settings for [`OpenAiProvider`]
#[derive(Debug, Clone)]
pub struct ProviderSettings {
    /// Base URL, without the `/chat/completions` suffix
    pub base_url: String,

    /// Model name
    pub model: String,

    /// Bearer token (may be empty for local gateways)
    pub api_key: String,

    /// Sampling temperature
    pub temperature: f32,

    /// Completion token budget; `None` picks the model default
    pub max_tokens: Option<u32>,

    /// Attempts per request (at least one is always made)
    pub max_retries: u32,

    /// Request timeout
    pub timeout: Duration,
}

impl ProviderSettings {
    /// Settings with defaults for everything but endpoint and model
    pub fn new(base_url: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            model: model.into(),
            api_key: String::new(),
            temperature: DEFAULT_TEMPERATURE,
            max_tokens: None,
            max_retries: DEFAULT_MAX_RETRIES,
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }
}

/// Chat model backed by an OpenAI-compatible HTTP endpoint
pub struct OpenAiProvider {
    settings: ProviderSettings,
    client: reqwest::Client,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<Value>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    tools: Vec<Value>,
    temperature: f32,
    max_completion_tokens: u32,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
    #[serde(default)]
    usage: Option<Usage>,
}

#[derive(Deserialize)]
struct Choice {
    message: WireMessage,
}

#[derive(Deserialize)]
struct WireMessage {
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    tool_calls: Vec<WireToolCall>,
}

#[derive(Deserialize)]
struct WireToolCall {
    #[serde(default)]
    id: String,
    function: WireFunction,
}

#[derive(Deserialize)]
struct WireFunction {
    name: String,
    #[serde(default)]
    arguments: String,
}

#[derive(Deserialize)]
struct Usage {
    #[serde(default)]
    prompt_tokens: u64,
    #[serde(default)]
    completion_tokens: u64,
}

impl OpenAiProvider {
    /// Create a provider from settings
    pub fn new(settings: ProviderSettings) -> Self {
        let client = reqwest::Client::builder()
            .timeout(settings.timeout)
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());
        Self { settings, client }
    }

    /// Model name this provider talks to
    pub fn model(&self) -> &str {
        &self.settings.model
    }

    fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.settings.base_url.trim_end_matches('/'))
    }

    fn max_tokens(&self) -> u32 {
        self.settings
            .max_tokens
            .filter(|n| *n > 0)
            .unwrap_or_else(|| default_max_tokens(&self.settings.model))
    }

    async fn send_once(&self, body: &ChatRequest<'_>) -> Result<Message, LlmError> {
        let mut request = self.client.post(self.endpoint()).json(body);
        if !self.settings.api_key.is_empty() {
            request = request.bearer_auth(&self.settings.api_key);
        }

        let response = request
            .send()
            .await
            .map_err(|e| LlmError::Communication(format!("Request failed: {}", e)))?;

        let status = response.status();
        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Err(LlmError::RateLimitExceeded);
        }
        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(LlmError::ModelNotAvailable(self.settings.model.clone()));
        }
        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            let message = format!("HTTP {}: {}", status, error_text);
            return Err(if status.is_server_error() {
                LlmError::Communication(message)
            } else {
                LlmError::InvalidResponse(message)
            });
        }

        let parsed: ChatResponse = response
            .json()
            .await
            .map_err(|e| LlmError::InvalidResponse(format!("Failed to parse response: {}", e)))?;

        if let Some(usage) = &parsed.usage {
            debug!(
                "Model {} usage: {} (input), {} (output)",
                self.settings.model, usage.prompt_tokens, usage.completion_tokens
            );
        }

        from_wire(parsed)
    }
}

/// Pause after failed attempt `attempt` (1-based): 1s, 2s, 4s, ... capped
fn retry_delay(attempt: u32) -> Duration {
    Duration::from_secs(2u64.saturating_pow(attempt.saturating_sub(1))).min(MAX_RETRY_DELAY)
}

fn from_wire(parsed: ChatResponse) -> Result<Message, LlmError> {
    let choice = parsed
        .choices
        .into_iter()
        .next()
        .ok_or_else(|| LlmError::InvalidResponse("Response has no choices".to_string()))?;

    let tool_calls = choice
        .message
        .tool_calls
        .into_iter()
        .map(|call| ToolCall::new(call.id, call.function.name, call.function.arguments))
        .collect();

    Ok(Message::assistant_with_tools(
        choice.message.content.unwrap_or_default(),
        tool_calls,
    ))
}

fn message_to_wire(message: &Message) -> Value {
    let mut wire = Map::new();
    wire.insert("role".into(), json!(message.role.as_str()));
    wire.insert("content".into(), json!(message.content));

    match message.role {
        Role::Assistant if !message.tool_calls.is_empty() => {
            let calls: Vec<Value> = message
                .tool_calls
                .iter()
                .map(|call| {
                    json!({
                        "id": call.id,
                        "type": "function",
                        "function": { "name": call.name, "arguments": call.arguments },
                    })
                })
                .collect();
            wire.insert("tool_calls".into(), Value::Array(calls));
        }
        Role::Tool => {
            if let Some(id) = &message.tool_call_id {
                wire.insert("tool_call_id".into(), json!(id));
            }
            if let Some(name) = &message.tool_name {
                wire.insert("name".into(), json!(name));
            }
        }
        _ => {}
    }

    Value::Object(wire)
}

fn tool_to_wire(tool: &ToolSchema) -> Value {
    let mut properties = Map::new();
    let mut required = Vec::new();
    for param in &tool.params {
        properties.insert(
            param.name.clone(),
            json!({ "type": param.kind.as_json_type(), "description": param.description }),
        );
        if param.required {
            required.push(json!(param.name));
        }
    }

    json!({
        "type": "function",
        "function": {
            "name": tool.name,
            "description": tool.description,
            "parameters": {
                "type": "object",
                "properties": properties,
                "required": required,
            },
        },
    })
}

#[async_trait]
impl ChatModel for OpenAiProvider {
    type Error = LlmError;

    fn check_tools(&self, tools: &[ToolSchema]) -> Result<(), LlmError> {
        validate_tools(tools)
    }

    async fn generate(&self, messages: &[Message], tools: &[ToolSchema]) -> Result<Message, LlmError> {
        let body = ChatRequest {
            model: &self.settings.model,
            messages: messages.iter().map(message_to_wire).collect(),
            tools: tools.iter().map(tool_to_wire).collect(),
            temperature: self.settings.temperature,
            max_completion_tokens: self.max_tokens(),
        };

        let attempts = self.settings.max_retries.max(1);
        let mut attempt = 0;
        loop {
            attempt += 1;
            match self.send_once(&body).await {
                Ok(reply) => return Ok(reply),
                Err(e) if e.is_transient() && attempt < attempts => {
                    let delay = retry_delay(attempt);
                    warn!("Model call attempt {}/{} failed: {}, retrying in {:?}", attempt, attempts, e, delay);
                    tokio::time::sleep(delay).await;
                }
                Err(e) => return Err(e),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use accrue_domain::ParamKind;

    #[test]
    fn test_default_max_tokens() {
        assert_eq!(default_max_tokens("qwen3-max"), 65_536);
        assert_eq!(default_max_tokens("qwen-plus"), 32_768);
        assert_eq!(default_max_tokens("unknown-model"), 32_768);
    }

    #[test]
    fn test_settings_defaults() {
        let settings = ProviderSettings::new(OPENAI_BASE_URL, "gpt-4o-mini");
        assert_eq!(settings.max_retries, DEFAULT_MAX_RETRIES);
        assert_eq!(settings.temperature, DEFAULT_TEMPERATURE);
        assert!(settings.max_tokens.is_none());
    }

    #[test]
    fn test_retry_delay_is_capped() {
        assert_eq!(retry_delay(1), Duration::from_secs(1));
        assert_eq!(retry_delay(3), Duration::from_secs(4));
        assert_eq!(retry_delay(6), MAX_RETRY_DELAY);
        assert_eq!(retry_delay(100), MAX_RETRY_DELAY);
    }

    #[test]
    fn test_endpoint_trims_slash() {
        let provider = OpenAiProvider::new(ProviderSettings::new("http://localhost:8000/v1/", "m"));
        assert_eq!(provider.endpoint(), "http://localhost:8000/v1/chat/completions");
    }

    #[test]
    fn test_max_tokens_override() {
        let settings = ProviderSettings {
            max_tokens: Some(1024),
            ..ProviderSettings::new(OPENAI_BASE_URL, "qwen3-max")
        };
        assert_eq!(OpenAiProvider::new(settings).max_tokens(), 1024);

        let settings = ProviderSettings {
            max_tokens: Some(0),
            ..ProviderSettings::new(OPENAI_BASE_URL, "qwen3-max")
        };
        assert_eq!(OpenAiProvider::new(settings).max_tokens(), 65_536);
    }

    #[test]
    fn test_tool_to_wire() {
        let tool = ToolSchema::new("RecordMatchRuleTool", "Record a verdict")
            .param("matched", ParamKind::Boolean, "Whether current rule matches");
        let wire = tool_to_wire(&tool);
        assert_eq!(wire["function"]["name"], "RecordMatchRuleTool");
        assert_eq!(wire["function"]["parameters"]["properties"]["matched"]["type"], "boolean");
        assert_eq!(wire["function"]["parameters"]["required"][0], "matched");
    }

    #[test]
    fn test_message_to_wire_tool_result() {
        let call = ToolCall::new("call_9", "fill", "{}");
        let wire = message_to_wire(&Message::tool_result(&call));
        assert_eq!(wire["role"], "tool");
        assert_eq!(wire["tool_call_id"], "call_9");
    }

    #[test]
    fn test_from_wire_with_tool_calls() {
        let raw = r#"{
            "choices": [{
                "message": {
                    "content": null,
                    "tool_calls": [{
                        "id": "call_1",
                        "type": "function",
                        "function": {"name": "fillExtractedInfoTool", "arguments": "{\"extractedInfo\":{}}"}
                    }]
                }
            }],
            "usage": {"prompt_tokens": 10, "completion_tokens": 5}
        }"#;
        let parsed: ChatResponse = serde_json::from_str(raw).unwrap();
        let message = from_wire(parsed).unwrap();
        assert_eq!(message.role, Role::Assistant);
        assert_eq!(message.content, "");
        assert_eq!(message.tool_calls[0].name, "fillExtractedInfoTool");
    }

    #[test]
    fn test_from_wire_without_choices() {
        let parsed: ChatResponse = serde_json::from_str(r#"{"choices": []}"#).unwrap();
        assert!(matches!(from_wire(parsed), Err(LlmError::InvalidResponse(_))));
    }

    #[tokio::test]
    async fn test_unreachable_endpoint() {
        let settings = ProviderSettings {
            max_retries: 1,
            timeout: Duration::from_secs(2),
            ..ProviderSettings::new("http://127.0.0.1:1", "m")
        };
        let provider = OpenAiProvider::new(settings);

        let result = provider.generate(&[Message::user("hi")], &[]).await;
        assert!(matches!(result, Err(LlmError::Communication(_))));
    }
}
