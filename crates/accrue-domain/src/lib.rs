//! Accrue Domain Layer
//!
//! The vocabulary shared by every other Accrue crate: the inputs an engine
//! run consumes, the outputs it accumulates, and the contract of the
//! language-model collaborator that drives it.
//!
//! ## Key Concepts
//!
//! - **Unit**: one atomic input processed per turn (a [`Material`] or a [`Rule`])
//! - **FieldSpec**: a named output slot requested from the model, paired with
//!   a synthetic `<name>Reason` slot
//! - **Verdict**: the outcome of checking one rule
//! - **Message / ToolSchema**: what goes to and comes back from the model
//! - **ChatModel**: the model-invocation trait implemented in `accrue-llm`
//!
//! ## Architecture
//!
//! This crate holds no infrastructure. Model providers, the engine and the
//! memory subsystem all depend on it, never the other way around.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod field;
pub mod message;
pub mod template;
pub mod traits;
pub mod unit;
pub mod verdict;

// Re-exports for convenience
pub use field::{FieldSpec, REASON_SUFFIX};
pub use message::{Message, ParamKind, Role, ToolCall, ToolParam, ToolSchema};
pub use template::render_template;
pub use traits::ChatModel;
pub use unit::{Material, Rule};
pub use verdict::Verdict;
