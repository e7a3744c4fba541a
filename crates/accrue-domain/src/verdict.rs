//! Verdict module - the outcome of checking one rule

use serde::{Deserialize, Serialize};

/// Whether a rule matched, and why
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Verdict {
    /// Name of the rule this verdict is about
    pub name: String,

    /// Whether the rule matched the context
    pub matched: bool,

    /// How the decision was made
    #[serde(default)]
    pub reason: String,
}

impl Verdict {
    /// Create a new verdict
    pub fn new(name: impl Into<String>, matched: bool, reason: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            matched,
            reason: reason.into(),
        }
    }
}
