//! The two kinds of work the sequential engine can drive
//!
//! A [`Task`] supplies everything that differs between extraction and
//! matching: the tool the model is given, how a turn is composed, how the
//! payload is read, how it is folded into state and what the caller gets at
//! the end. The engine owns the loop.

use crate::config::EngineConfig;
use crate::error::EngineError;
use crate::merge::{ExtractionState, MatchState};
use crate::parser::{parse_extracted, parse_verdict, PayloadError};
use crate::prompt::{Composed, ExtractionPrompt, MatchingPrompt};
use crate::types::{ExtractionOutput, ExtractionRequest, MatchOutput, MatchRequest, TurnResult};
use accrue_domain::field::with_reason_fields;
use accrue_domain::{FieldSpec, Material, ParamKind, Rule, ToolSchema};
use tracing::debug;

/// Name of the tool the model calls to report extracted fields
pub const EXTRACT_TOOL_NAME: &str = "fillExtractedInfoTool";

/// Name of the tool the model calls to record a rule verdict
pub const MATCH_TOOL_NAME: &str = "RecordMatchRuleTool";

/// Per-run behaviour plugged into the sequential engine
pub trait Task: Send + Sync + 'static {
    /// Item consumed per turn
    type Unit: Clone + Send + Sync + 'static;

    /// Accumulated state threaded through the turns
    type State: Send + 'static;

    /// What the caller gets back
    type Output: Send + 'static;

    /// Short name used in logs
    fn name(&self) -> &'static str;

    /// The single tool the model is given
    fn tool(&self) -> &ToolSchema;

    /// State before the first turn
    fn initial_state(&self) -> Self::State;

    /// Messages for the unit under `cursor`, or [`Composed::NoMoreInput`]
    fn compose(&self, cursor: usize, units: &[Self::Unit], state: &Self::State, now: &str) -> Composed;

    /// Read the tool payload of one turn
    fn interpret(&self, payload: &str) -> Result<TurnResult, PayloadError>;

    /// Fold one turn into the state
    fn merge(&self, state: Self::State, turn: TurnResult) -> Self::State;

    /// Turn the final state into the caller's result
    fn finalize(&self, state: Self::State) -> Self::Output;
}

/// Fill requested fields from a list of materials
#[derive(Debug, Clone)]
pub struct ExtractionTask {
    tool: ToolSchema,
    requested: Vec<FieldSpec>,
    prompt: ExtractionPrompt,
}

impl ExtractionTask {
    /// Build the task for one request
    ///
    /// Fails if a requested field name ends with the reserved reason suffix.
    pub fn new(request: &ExtractionRequest, config: &EngineConfig) -> Result<Self, EngineError> {
        if let Some(field) = request.fields.iter().find(|f| f.is_reason()) {
            return Err(EngineError::ReservedField(field.name.clone()));
        }

        let prompt = ExtractionPrompt::new(
            &config.prompts,
            &config.language,
            &request.context,
            &with_reason_fields(&request.fields),
        );

        Ok(Self {
            tool: extract_tool(),
            requested: request.fields.clone(),
            prompt,
        })
    }
}

/// Schema of the extraction tool
pub fn extract_tool() -> ToolSchema {
    ToolSchema::new(EXTRACT_TOOL_NAME, "Call this tool to fill in the extracted information.").param(
        "extractedInfo",
        ParamKind::Object,
        "Extracted information in JSON format",
    )
}

impl Task for ExtractionTask {
    type Unit = Material;
    type State = ExtractionState;
    type Output = ExtractionOutput;

    fn name(&self) -> &'static str {
        "extraction"
    }

    fn tool(&self) -> &ToolSchema {
        &self.tool
    }

    fn initial_state(&self) -> ExtractionState {
        ExtractionState::new()
    }

    fn compose(&self, cursor: usize, units: &[Material], state: &ExtractionState, now: &str) -> Composed {
        self.prompt.compose(cursor, units, state.values(), now)
    }

    fn interpret(&self, payload: &str) -> Result<TurnResult, PayloadError> {
        parse_extracted(payload).map(TurnResult::Extracted)
    }

    fn merge(&self, state: ExtractionState, turn: TurnResult) -> ExtractionState {
        let TurnResult::Extracted(values) = turn else {
            return state;
        };
        let (state, touched) = state.merge(&values);
        let unresolved = state.unresolved();
        debug!(
            "Merged {} field(s) {:?}, {} still empty",
            touched.len(),
            touched,
            unresolved.len()
        );
        state
    }

    fn finalize(&self, state: ExtractionState) -> ExtractionOutput {
        state.finalize(&self.requested)
    }
}

/// Check each rule of a list against some context
#[derive(Debug, Clone)]
pub struct MatchingTask {
    tool: ToolSchema,
    prompt: MatchingPrompt,
}

impl MatchingTask {
    /// Build the task for one request
    pub fn new(request: &MatchRequest, config: &EngineConfig) -> Self {
        Self {
            tool: match_tool(),
            prompt: MatchingPrompt::new(
                &config.prompts,
                &config.language,
                &request.task_instruction,
                &request.context,
            ),
        }
    }
}

/// Schema of the matching tool
pub fn match_tool() -> ToolSchema {
    ToolSchema::new(
        MATCH_TOOL_NAME,
        "Call this tool to record the information about the rule matched.",
    )
    .param("reason", ParamKind::String, "How you make your decision")
    .param("matched", ParamKind::Boolean, "Whether current rule matches")
    .param("name", ParamKind::String, "current rule name")
}

impl Task for MatchingTask {
    type Unit = Rule;
    type State = MatchState;
    type Output = MatchOutput;

    fn name(&self) -> &'static str {
        "matching"
    }

    fn tool(&self) -> &ToolSchema {
        &self.tool
    }

    fn initial_state(&self) -> MatchState {
        MatchState::new()
    }

    fn compose(&self, cursor: usize, units: &[Rule], _state: &MatchState, now: &str) -> Composed {
        self.prompt.compose(cursor, units, now)
    }

    fn interpret(&self, payload: &str) -> Result<TurnResult, PayloadError> {
        parse_verdict(payload).map(TurnResult::Verdict)
    }

    fn merge(&self, state: MatchState, turn: TurnResult) -> MatchState {
        match turn {
            TurnResult::Verdict(verdict) => state.merge(Some(verdict)),
            _ => state.merge(None),
        }
    }

    fn finalize(&self, state: MatchState) -> MatchOutput {
        MatchOutput {
            verdicts: state.into_verdicts(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use accrue_domain::Verdict;

    fn request(fields: Vec<FieldSpec>) -> ExtractionRequest {
        ExtractionRequest {
            context: String::new(),
            materials: vec![Material::new("Total: 100", "invoice")],
            fields,
        }
    }

    #[test]
    fn test_reserved_field_rejected() {
        let result = ExtractionTask::new(
            &request(vec![FieldSpec::new("amountReason", "")]),
            &EngineConfig::default(),
        );
        assert!(matches!(result, Err(EngineError::ReservedField(name)) if name == "amountReason"));
    }

    #[test]
    fn test_extraction_prompt_lists_reason_fields() {
        let task = ExtractionTask::new(&request(vec![FieldSpec::new("amount", "Total")]), &EngineConfig::default()).unwrap();
        let units = vec![Material::new("Total: 100", "invoice")];
        let messages = task.compose(0, &units, &task.initial_state(), "NOW").into_messages();
        assert!(messages[1].content.contains("1. amountReason: Based on what and how you extract field amount"));
        assert!(messages[1].content.contains("2. amount: Total"));
    }

    #[test]
    fn test_extraction_merge_ignores_verdicts() {
        let task = ExtractionTask::new(&request(vec![]), &EngineConfig::default()).unwrap();
        let state = task.merge(task.initial_state(), TurnResult::Verdict(Verdict::new("r", true, "")));
        assert!(state.values().is_empty());
    }

    #[test]
    fn test_matching_interpret_and_merge() {
        let task = MatchingTask::new(&MatchRequest::default(), &EngineConfig::default());
        let turn = task.interpret(r#"{"name":"r1","matched":true,"reason":"yes"}"#).unwrap();
        let state = task.merge(task.initial_state(), turn);
        let state = task.merge(state, TurnResult::Empty);
        assert_eq!(task.finalize(state).verdicts, vec![Verdict::new("r1", true, "yes")]);
    }

    #[test]
    fn test_tool_schemas() {
        assert_eq!(extract_tool().name, EXTRACT_TOOL_NAME);
        assert_eq!(extract_tool().params[0].kind, ParamKind::Object);
        let names: Vec<_> = match_tool().params.iter().map(|p| p.name.clone()).collect();
        assert_eq!(names, ["reason", "matched", "name"]);
    }
}
