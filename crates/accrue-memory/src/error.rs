//! Error types for conversation memory

use thiserror::Error;

/// Errors from the memory store or the summarizing model
#[derive(Error, Debug)]
pub enum MemoryError {
    /// The backing store failed
    #[error("Store error: {0}")]
    Store(String),

    /// A stored value could not be encoded or decoded
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The summarizing model failed
    #[error("Summarizer error: {0}")]
    Summarizer(String),
}
