//! Accrue Memory
//!
//! Per-key conversation memory: recent exchanges verbatim, older ones folded
//! into a model-written summary. Storage sits behind the [`MemoryStore`]
//! contract, which also provides the per-key lock that serializes
//! read-modify-write cycles.
//!
//! # Example Usage
//!
//! ```no_run
//! use accrue_llm::MockModel;
//! use accrue_memory::{Conversation, ConversationMemory, InMemoryStore};
//! use std::sync::Arc;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let memory = ConversationMemory::new("user-42", Arc::new(InMemoryStore::new()), Arc::new(MockModel::new()));
//!
//! memory.append(Conversation::now("What is due?", "Invoice 17, 100 EUR")).await?;
//! let (summary, recent) = memory.load_formatted().await?;
//! println!("{}\n{}", summary, recent);
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]

mod conversation;
mod error;
mod memory;
mod store;
mod summarizer;

pub use conversation::{format_conversations, Conversation};
pub use error::MemoryError;
pub use memory::{ConversationMemory, MemoryOptions, Recall};
pub use store::{InMemoryStore, KeyGuard, MemoryStore};
pub use summarizer::{strip_think, Summarizer, SummarizerPrompts};
