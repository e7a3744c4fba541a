//! Request and response types for extraction and matching

use accrue_domain::{FieldSpec, Material, Rule, Verdict};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Request to extract field values from a list of materials
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExtractionRequest {
    /// Free-form notes about the task, added to the system message
    #[serde(default)]
    pub context: String,

    /// Materials, read in order
    pub materials: Vec<Material>,

    /// Fields to fill; empty means "extract whatever is relevant"
    #[serde(default)]
    pub fields: Vec<FieldSpec>,
}

/// Result of an extraction run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractionOutput {
    /// Extracted values keyed by field name
    ///
    /// When fields were requested, the key set is exactly the requested
    /// names and unresolved fields hold an empty string.
    pub fields: BTreeMap<String, String>,

    /// Justification for each value, keyed by the same field name
    pub reasons: BTreeMap<String, String>,
}

/// Request to check a list of rules against some context
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MatchRequest {
    /// How the model should decide whether a rule matches
    #[serde(default)]
    pub task_instruction: String,

    /// Information about the target the rules are checked against
    #[serde(default)]
    pub context: String,

    /// Rules, checked in order
    pub rules: Vec<Rule>,
}

/// Result of a matching run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchOutput {
    /// One verdict per rule the model recorded, in processing order
    pub verdicts: Vec<Verdict>,
}

impl MatchOutput {
    /// Verdicts whose rule matched
    pub fn matched(&self) -> impl Iterator<Item = &Verdict> {
        self.verdicts.iter().filter(|v| v.matched)
    }
}

/// What one turn's tool invocation produced
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TurnResult {
    /// The tool was not invoked, or its payload could not be parsed
    Empty,

    /// Key/value pairs from the extraction tool
    Extracted(BTreeMap<String, String>),

    /// A rule verdict from the matching tool
    Verdict(Verdict),
}

impl TurnResult {
    /// Whether this turn produced nothing
    pub fn is_empty(&self) -> bool {
        matches!(self, TurnResult::Empty)
    }
}
