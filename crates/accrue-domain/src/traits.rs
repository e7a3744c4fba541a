//! Trait definitions for external interactions
//!
//! These traits define the boundary between the accumulation logic and the
//! model infrastructure. Implementations live in `accrue-llm`.

use crate::message::{Message, ToolSchema};
use async_trait::async_trait;
use std::sync::Arc;

/// A chat-completion model that can call tools
///
/// Implemented by the infrastructure layer (accrue-llm)
#[async_trait]
pub trait ChatModel: Send + Sync {
    /// Error type for model operations
    type Error: std::error::Error + Send + Sync + 'static;

    /// Check that the model accepts the given tool declarations
    ///
    /// Called once when an engine is built, before any turn runs.
    fn check_tools(&self, _tools: &[ToolSchema]) -> Result<(), Self::Error> {
        Ok(())
    }

    /// Run one completion over `messages` with `tools` available
    ///
    /// The returned assistant message carries zero or more tool calls.
    async fn generate(&self, messages: &[Message], tools: &[ToolSchema]) -> Result<Message, Self::Error>;
}

#[async_trait]
impl<M> ChatModel for Arc<M>
where
    M: ChatModel + ?Sized,
{
    type Error = M::Error;

    fn check_tools(&self, tools: &[ToolSchema]) -> Result<(), Self::Error> {
        (**self).check_tools(tools)
    }

    async fn generate(&self, messages: &[Message], tools: &[ToolSchema]) -> Result<Message, Self::Error> {
        (**self).generate(messages, tools).await
    }
}
