//! Fold old conversations into a long-term summary

use crate::error::MemoryError;
use accrue_domain::{render_template, ChatModel, Message};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::debug;

const SYSTEM_PROMPT: &str = r#"
Write a short but context rich summary of the conversation so far. Focus on what the user explicitly asked for and what you did in response.

Capture the user's requests, intents, interests and requirements well enough that the conversation can continue without losing context. Your summary replaces the existing <long_term_memory>.

Structure the summary as follows:

<summary>
1. Primary Request and Intent:
   [Detailed description]

2. Explicit Requirements:
   - [Requirement]

3. Key Concepts:
   - [Concept]

4. Problem Solving:
   [Problems solved and troubleshooting in progress]

5. Pending Tasks:
   - [Task]

6. Current Work:
   [What is being worked on right now]
</summary>
"#;

const USER_PROMPT: &str = r#"
<recent_conversation>
${recent_conversation}
</recent_conversation>

<long_term_memory>
${long_term_memory}
</long_term_memory>
"#;

/// Summarizer prompt templates with `${name}` placeholders
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SummarizerPrompts {
    /// System message
    pub system: String,

    /// User message: `${recent_conversation}`, `${long_term_memory}`
    pub user: String,
}

impl Default for SummarizerPrompts {
    fn default() -> Self {
        Self {
            system: SYSTEM_PROMPT.trim().to_string(),
            user: USER_PROMPT.trim().to_string(),
        }
    }
}

/// Drop a leading `<think>...</think>` block from a model answer
pub fn strip_think(content: &str) -> &str {
    let trimmed = content.trim();
    match trimmed.strip_prefix("<think>").and_then(|rest| rest.split_once("</think>")) {
        Some((_, answer)) => answer.trim(),
        None => trimmed,
    }
}

/// Summarizes conversations with a chat model
pub struct Summarizer<M> {
    model: Arc<M>,
    prompts: Arc<SummarizerPrompts>,
}

impl<M> Clone for Summarizer<M> {
    fn clone(&self) -> Self {
        Self {
            model: Arc::clone(&self.model),
            prompts: Arc::clone(&self.prompts),
        }
    }
}

impl<M: ChatModel> Summarizer<M> {
    /// Create a summarizer over `model`
    pub fn new(model: Arc<M>) -> Self {
        Self::with_prompts(model, SummarizerPrompts::default())
    }

    /// Create a summarizer with custom prompt templates
    pub fn with_prompts(model: Arc<M>, prompts: SummarizerPrompts) -> Self {
        Self {
            model,
            prompts: Arc::new(prompts),
        }
    }

    /// Prompt templates in use
    pub fn prompts(&self) -> &SummarizerPrompts {
        &self.prompts
    }

    /// Merge `recent` conversation text into the `long_term` summary
    pub async fn summarize(&self, long_term: &str, recent: &str) -> Result<String, MemoryError> {
        let user = render_template(
            &self.prompts.user,
            &[("recent_conversation", recent), ("long_term_memory", long_term)],
        );
        let messages = [Message::system(self.prompts.system.clone()), Message::user(user)];
        debug!("Summarizing {} chars of conversation", recent.len());

        let reply = self
            .model
            .generate(&messages, &[])
            .await
            .map_err(|e| MemoryError::Summarizer(e.to_string()))?;

        Ok(strip_think(&reply.content).to_string())
    }
}
