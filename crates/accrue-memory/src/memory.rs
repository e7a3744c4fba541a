//! Short-term and long-term conversation memory for one key
//!
//! Recent exchanges are kept verbatim in a short-term list. Once the list
//! reaches the compaction threshold, its oldest half is summarized together
//! with the previous long-term summary, and the new summary replaces it.

use crate::conversation::{format_conversations, Conversation};
use crate::error::MemoryError;
use crate::store::MemoryStore;
use crate::summarizer::Summarizer;
use accrue_domain::ChatModel;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

const DEFAULT_TTL: Duration = Duration::from_secs(60 * 60 * 24 * 30);

/// Compaction and expiry settings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MemoryOptions {
    compact_threshold: usize,
    long_term_ttl: Duration,
    short_term_ttl: Duration,
}

impl Default for MemoryOptions {
    fn default() -> Self {
        Self {
            compact_threshold: 4,
            long_term_ttl: DEFAULT_TTL,
            short_term_ttl: DEFAULT_TTL,
        }
    }
}

impl MemoryOptions {
    /// Compact once the short-term list holds `n` conversations (at least 2)
    pub fn with_compact_threshold(mut self, n: usize) -> Self {
        self.compact_threshold = n.max(2);
        self
    }

    /// Expiry of the long-term summary
    pub fn with_long_term_ttl(mut self, ttl: Duration) -> Self {
        self.long_term_ttl = ttl;
        self
    }

    /// Expiry of the short-term list
    pub fn with_short_term_ttl(mut self, ttl: Duration) -> Self {
        self.short_term_ttl = ttl;
        self
    }

    /// Short-term list length that triggers compaction
    pub fn compact_threshold(&self) -> usize {
        self.compact_threshold
    }

    /// Conversations folded into the summary per compaction
    pub fn compact_count(&self) -> usize {
        self.compact_threshold / 2
    }
}

/// What a memory holds for its key
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Recall {
    /// Summary of older conversations
    pub long_term: String,

    /// Recent conversations, newest first
    pub short_term: Vec<Conversation>,
}

/// Conversation memory for one key
pub struct ConversationMemory<S, M> {
    key: String,
    store: Arc<S>,
    summarizer: Summarizer<M>,
    options: MemoryOptions,
}

impl<S, M> ConversationMemory<S, M>
where
    S: MemoryStore,
    M: ChatModel,
{
    /// Create a memory for `key` with default options
    pub fn new(key: impl Into<String>, store: Arc<S>, model: Arc<M>) -> Self {
        Self {
            key: key.into(),
            store,
            summarizer: Summarizer::new(model),
            options: MemoryOptions::default(),
        }
    }

    /// Replace the options
    pub fn with_options(mut self, options: MemoryOptions) -> Self {
        self.options = options;
        self
    }

    /// Replace the summarizer, e.g. one built with custom prompts
    pub fn with_summarizer(mut self, summarizer: Summarizer<M>) -> Self {
        self.summarizer = summarizer;
        self
    }

    fn short_term_key(&self) -> String {
        format!("accrue:memory:short-term:{}", self.key)
    }

    fn long_term_key(&self) -> String {
        format!("accrue:memory:long-term:{}", self.key)
    }

    fn lock_key(&self) -> String {
        format!("accrue:memory:lock:{}", self.key)
    }

    async fn load_short_term(&self) -> Result<Vec<Conversation>, MemoryError> {
        match self.store.load(&self.short_term_key()).await? {
            Some(raw) => Ok(serde_json::from_str(&raw)?),
            None => Ok(Vec::new()),
        }
    }

    async fn load_long_term(&self) -> Result<String, MemoryError> {
        Ok(self.store.load(&self.long_term_key()).await?.unwrap_or_default())
    }

    /// Long-term summary and short-term list, newest first
    pub async fn load(&self) -> Result<Recall, MemoryError> {
        let _guard = self.store.lock(&self.lock_key()).await?;

        let mut short_term = self.load_short_term().await?;
        short_term.reverse();
        let long_term = self.load_long_term().await?;

        Ok(Recall { long_term, short_term })
    }

    /// Long-term summary and the short-term list rendered as text
    pub async fn load_formatted(&self) -> Result<(String, String), MemoryError> {
        let recall = self.load().await?;
        Ok((recall.long_term, format_conversations(&recall.short_term)))
    }

    /// Record one exchange, compacting if the short-term list is full
    pub async fn append(&self, conversation: Conversation) -> Result<(), MemoryError> {
        let _guard = self.store.lock(&self.lock_key()).await?;

        let mut short_term = self.load_short_term().await?;
        short_term.push(conversation);

        if short_term.len() >= self.options.compact_threshold {
            let mut oldest: Vec<Conversation> = short_term.drain(..self.options.compact_count()).collect();
            oldest.reverse();

            let long_term = self.load_long_term().await?;
            let summary = self
                .summarizer
                .summarize(&long_term, &format_conversations(&oldest))
                .await?;
            self.store
                .store(&self.long_term_key(), summary, self.options.long_term_ttl)
                .await?;
            info!(
                "Compacted {} conversation(s) of '{}' into long-term memory",
                oldest.len(),
                self.key
            );
        }

        debug!("Storing {} short-term conversation(s) for '{}'", short_term.len(), self.key);
        self.store
            .store(
                &self.short_term_key(),
                serde_json::to_string(&short_term)?,
                self.options.short_term_ttl,
            )
            .await
    }
}
