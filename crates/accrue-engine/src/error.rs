//! Error types for the engine
//!
//! Only run-level failures live here. A turn whose tool output is missing or
//! malformed is not an error: it contributes nothing and the run continues.

use thiserror::Error;

/// Errors that abort an engine run (or a whole batch)
#[derive(Error, Debug)]
pub enum EngineError {
    /// The model collaborator failed (transport, HTTP status, bad envelope)
    #[error("Model error: {0}")]
    Model(String),

    /// The model refused the tool declaration
    #[error("Tool registration failed: {0}")]
    ToolRegistration(String),

    /// A requested field uses the reserved reason suffix
    #[error("Field name '{0}' ends with the reserved suffix 'Reason'")]
    ReservedField(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// A batch worker panicked or was cancelled
    #[error("Worker error: {0}")]
    Worker(String),
}
