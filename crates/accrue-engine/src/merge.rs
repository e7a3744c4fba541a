//! Fold one turn's result into the accumulated state
//!
//! Extraction rules, applied in order:
//! 1. every non-reason key with a non-empty value is written and marked touched
//! 2. every touched key gets its reason copied from the same turn, even if empty
//! 3. fields that are still empty keep whatever reason they already had
//!
//! Nothing is ever removed and no value is ever blanked, so a resolved field
//! cannot flap back to empty on a later turn.

use crate::types::ExtractionOutput;
use accrue_domain::field::{is_reason_name, reason_name};
use accrue_domain::{FieldSpec, Verdict, REASON_SUFFIX};
use std::collections::{BTreeMap, BTreeSet};

/// Field values accumulated over an extraction run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtractionState {
    values: BTreeMap<String, String>,
}

impl ExtractionState {
    /// Empty state
    pub fn new() -> Self {
        Self::default()
    }

    /// Everything accumulated so far, reason keys included
    pub fn values(&self) -> &BTreeMap<String, String> {
        &self.values
    }

    /// Merge one turn; returns the new state and the primary keys it updated
    pub fn merge(mut self, turn: &BTreeMap<String, String>) -> (Self, BTreeSet<String>) {
        let touched: BTreeSet<String> = turn
            .iter()
            .filter(|(k, v)| !is_reason_name(k) && !v.is_empty())
            .map(|(k, _)| k.clone())
            .collect();

        for key in &touched {
            self.values.insert(key.clone(), turn[key].clone());
        }

        for key in &touched {
            let reason_key = reason_name(key);
            let reason = turn.get(&reason_key).cloned().unwrap_or_default();
            self.values.insert(reason_key, reason);
        }

        (self, touched)
    }

    /// Primary fields present in the state whose value is still empty
    pub fn unresolved(&self) -> Vec<&str> {
        self.values
            .iter()
            .filter(|(k, v)| !is_reason_name(k) && v.is_empty())
            .map(|(k, _)| k.as_str())
            .collect()
    }

    /// Build the final output
    ///
    /// With requested fields, the output keys are exactly the requested
    /// names, unresolved ones mapped to the empty string. Without, every
    /// primary key seen during the run is returned.
    pub fn finalize(self, requested: &[FieldSpec]) -> ExtractionOutput {
        let mut output = ExtractionOutput::default();

        if requested.is_empty() {
            for (key, value) in &self.values {
                match key.strip_suffix(REASON_SUFFIX) {
                    Some(primary) if !primary.is_empty() => {
                        output.reasons.insert(primary.to_string(), value.clone());
                    }
                    _ => {
                        output.fields.insert(key.clone(), value.clone());
                    }
                }
            }
            return output;
        }

        for field in requested {
            let value = self.values.get(&field.name).cloned().unwrap_or_default();
            let reason = self.values.get(&reason_name(&field.name)).cloned().unwrap_or_default();
            output.fields.insert(field.name.clone(), value);
            output.reasons.insert(field.name.clone(), reason);
        }
        output
    }
}

/// Verdicts accumulated over a matching run, in processing order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MatchState {
    verdicts: Vec<Verdict>,
}

impl MatchState {
    /// Empty state
    pub fn new() -> Self {
        Self::default()
    }

    /// Verdicts so far
    pub fn verdicts(&self) -> &[Verdict] {
        &self.verdicts
    }

    /// Append the turn's verdict, if it produced one
    pub fn merge(mut self, verdict: Option<Verdict>) -> Self {
        if let Some(verdict) = verdict {
            self.verdicts.push(verdict);
        }
        self
    }

    /// Take the verdicts out
    pub fn into_verdicts(self) -> Vec<Verdict> {
        self.verdicts
    }
}
