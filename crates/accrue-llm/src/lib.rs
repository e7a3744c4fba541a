//! Accrue LLM Provider Layer
//!
//! Implementations of the `ChatModel` trait from `accrue-domain`.
//!
//! # Providers
//!
//! - `MockModel`: Scripted, deterministic model for testing
//! - `OpenAiProvider`: Any OpenAI-compatible chat-completions endpoint
//!
//! # Examples
//!
//! ```
//! use accrue_domain::{ChatModel, Message};
//! use accrue_llm::MockModel;
//!
//! # tokio_test_block(async {
//! let model = MockModel::new();
//! model.push_tool_call("fillExtractedInfoTool", r#"{"extractedInfo":{"amount":"100"}}"#);
//!
//! let reply = model.generate(&[Message::user("invoice")], &[]).await.unwrap();
//! assert_eq!(reply.tool_calls[0].name, "fillExtractedInfoTool");
//! # });
//! # fn tokio_test_block<F: std::future::Future>(f: F) -> F::Output {
//! #     tokio::runtime::Runtime::new().unwrap().block_on(f)
//! # }
//! ```

#![warn(missing_docs)]

pub mod openai;

use accrue_domain::{ChatModel, Message, Role, ToolCall, ToolSchema};
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use thiserror::Error;

pub use openai::{OpenAiProvider, ProviderSettings};

/// Errors that can occur during LLM operations
#[derive(Error, Debug)]
pub enum LlmError {
    /// Network or API communication error
    #[error("Communication error: {0}")]
    Communication(String),

    /// Invalid response from LLM
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// Rate limit exceeded
    #[error("Rate limit exceeded")]
    RateLimitExceeded,

    /// Model not available
    #[error("Model not available: {0}")]
    ModelNotAvailable(String),

    /// Tool declaration refused by the provider
    #[error("Tool rejected: {0}")]
    ToolRejected(String),

    /// Generic error
    #[error("LLM error: {0}")]
    Other(String),
}

impl LlmError {
    /// Whether retrying the same request may succeed
    pub fn is_transient(&self) -> bool {
        matches!(self, LlmError::Communication(_) | LlmError::RateLimitExceeded)
    }
}

/// Validate tool declarations the way OpenAI-compatible endpoints do
///
/// Names must be 1 to 64 characters of `[a-zA-Z0-9_-]` and parameter names
/// must be unique within a tool.
pub fn validate_tools(tools: &[ToolSchema]) -> Result<(), LlmError> {
    for tool in tools {
        let valid_name = !tool.name.is_empty()
            && tool.name.len() <= 64
            && tool
                .name
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
        if !valid_name {
            return Err(LlmError::ToolRejected(format!("invalid tool name '{}'", tool.name)));
        }

        let mut seen = std::collections::HashSet::new();
        for param in &tool.params {
            if !seen.insert(param.name.as_str()) {
                return Err(LlmError::ToolRejected(format!(
                    "duplicate parameter '{}' in tool '{}'",
                    param.name, tool.name
                )));
            }
        }
    }
    Ok(())
}

/// One scripted behaviour of the mock
#[derive(Debug, Clone)]
enum Scripted {
    Reply(Message),
    Fail(String),
}

/// Mock chat model for deterministic testing
///
/// Replies are chosen in this order:
/// 1. the first rule whose needle occurs in the last user message
/// 2. the next queued reply
/// 3. a plain text reply without tool calls
///
/// Keyed rules make the mock usable from concurrent engine runs, where the
/// order in which the queue is drained is not deterministic.
#[derive(Debug, Clone)]
pub struct MockModel {
    rules: Arc<Mutex<Vec<(String, Scripted)>>>,
    queue: Arc<Mutex<VecDeque<Scripted>>>,
    prompts: Arc<Mutex<Vec<Vec<Message>>>>,
    rejected_tools: Option<String>,
    latency: Option<Duration>,
}

impl MockModel {
    /// Create a mock with nothing scripted
    pub fn new() -> Self {
        Self {
            rules: Arc::new(Mutex::new(Vec::new())),
            queue: Arc::new(Mutex::new(VecDeque::new())),
            prompts: Arc::new(Mutex::new(Vec::new())),
            rejected_tools: None,
            latency: None,
        }
    }

    /// Make every `check_tools` call fail with the given reason
    pub fn rejecting_tools(mut self, reason: impl Into<String>) -> Self {
        self.rejected_tools = Some(reason.into());
        self
    }

    /// Sleep this long inside every `generate` call
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    /// Queue a reply that invokes `tool` with `arguments`
    pub fn push_tool_call(&self, tool: impl Into<String>, arguments: impl Into<String>) {
        self.push(Scripted::Reply(tool_reply(tool.into(), arguments.into())));
    }

    /// Queue a plain text reply (no tool invoked)
    pub fn push_text(&self, text: impl Into<String>) {
        self.push(Scripted::Reply(Message::assistant(text)));
    }

    /// Queue an arbitrary reply
    pub fn push_reply(&self, reply: Message) {
        self.push(Scripted::Reply(reply));
    }

    /// Queue a transport failure
    pub fn push_error(&self, message: impl Into<String>) {
        self.push(Scripted::Fail(message.into()));
    }

    /// Invoke `tool` whenever the last user message contains `needle`
    pub fn add_tool_call_when(&self, needle: impl Into<String>, tool: impl Into<String>, arguments: impl Into<String>) {
        self.rules
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push((needle.into(), Scripted::Reply(tool_reply(tool.into(), arguments.into()))));
    }

    /// Fail whenever the last user message contains `needle`
    pub fn add_error_when(&self, needle: impl Into<String>, message: impl Into<String>) {
        self.rules
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push((needle.into(), Scripted::Fail(message.into())));
    }

    /// Number of `generate` calls so far
    pub fn call_count(&self) -> usize {
        self.prompts.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    /// Every message list passed to `generate`, in call order
    pub fn prompts(&self) -> Vec<Vec<Message>> {
        self.prompts.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    fn push(&self, scripted: Scripted) {
        self.queue.lock().unwrap_or_else(PoisonError::into_inner).push_back(scripted);
    }

    fn next_for(&self, messages: &[Message]) -> Scripted {
        let last_user = messages
            .iter()
            .rev()
            .find(|m| m.role == Role::User)
            .map(|m| m.content.as_str())
            .unwrap_or_default();

        let keyed = self
            .rules
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .find(|(needle, _)| last_user.contains(needle.as_str()))
            .map(|(_, scripted)| scripted.clone());

        keyed
            .or_else(|| self.queue.lock().unwrap_or_else(PoisonError::into_inner).pop_front())
            .unwrap_or_else(|| Scripted::Reply(Message::assistant("Default mock response")))
    }
}

impl Default for MockModel {
    fn default() -> Self {
        Self::new()
    }
}

fn tool_reply(tool: String, arguments: String) -> Message {
    let id = format!("call_{}", uuid::Uuid::now_v7().simple());
    Message::assistant_with_tools("", vec![ToolCall::new(id, tool, arguments)])
}

#[async_trait]
impl ChatModel for MockModel {
    type Error = LlmError;

    fn check_tools(&self, tools: &[ToolSchema]) -> Result<(), LlmError> {
        if let Some(reason) = &self.rejected_tools {
            return Err(LlmError::ToolRejected(reason.clone()));
        }
        validate_tools(tools)
    }

    async fn generate(&self, messages: &[Message], _tools: &[ToolSchema]) -> Result<Message, LlmError> {
        self.prompts.lock().unwrap_or_else(PoisonError::into_inner).push(messages.to_vec());
        let scripted = self.next_for(messages);

        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }

        match scripted {
            Scripted::Reply(reply) => Ok(reply),
            Scripted::Fail(message) => Err(LlmError::Communication(message)),
        }
    }
}
