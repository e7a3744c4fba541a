//! Accrue Engine
//!
//! Turns an ordered list of unstructured inputs into one accumulated result by
//! calling a tool-capable chat model once per input.
//!
//! # Overview
//!
//! Two kinds of run share one loop:
//!
//! - **Extraction**: materials are read one by one and the model fills a set
//!   of requested fields. Values found on earlier materials are fed back into
//!   later prompts and are never blanked out again.
//! - **Matching**: rules are checked one by one and the model records a
//!   verdict for each.
//!
//! Matching can also be fanned out: the rule list is cut into sub-lists that
//! run concurrently on a bounded worker pool, each with its own state.
//!
//! # Architecture
//!
//! ```text
//! units → compose → ChatModel → tool payload → parse → merge → next unit
//!                                                            ↘ finalize
//! ```
//!
//! # Example Usage
//!
//! ```no_run
//! use accrue_domain::{FieldSpec, Material};
//! use accrue_engine::{EngineConfig, ExtractionRequest, Extractor};
//! use accrue_llm::MockModel;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let extractor = Extractor::new(MockModel::new(), EngineConfig::default());
//!
//! let request = ExtractionRequest {
//!     context: "Supplier invoices".to_string(),
//!     materials: vec![Material::new("Total due: 100 EUR", "invoice.pdf")],
//!     fields: vec![FieldSpec::new("amount", "Invoice total")],
//! };
//!
//! let output = extractor.extract(&request).await?;
//! println!("amount = {}", output.fields["amount"]);
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]

mod batch;
mod config;
mod engine;
mod error;
mod extractor;
mod matcher;
mod merge;
mod parser;
mod prompt;
mod task;
mod types;

#[cfg(test)]
mod tests;

pub use batch::{plan_batches, run_batched, WorkerPool};
pub use config::{BatchOrder, EngineConfig, PromptTemplates, DEFAULT_BATCH_SIZE};
pub use engine::{RunState, SequentialEngine, Step};
pub use error::EngineError;
pub use extractor::Extractor;
pub use matcher::RuleMatcher;
pub use merge::{ExtractionState, MatchState};
pub use parser::{locate_payload, parse_extracted, parse_object, parse_verdict, PayloadError};
pub use prompt::{
    current_time, format_fields, format_material, format_rule, format_time, Composed,
    ExtractionPrompt, MatchingPrompt,
};
pub use task::{extract_tool, match_tool, ExtractionTask, MatchingTask, Task, EXTRACT_TOOL_NAME, MATCH_TOOL_NAME};
pub use types::{ExtractionOutput, ExtractionRequest, MatchOutput, MatchRequest, TurnResult};
