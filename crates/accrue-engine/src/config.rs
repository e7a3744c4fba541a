//! Configuration for the engine

use serde::{Deserialize, Serialize};

/// Default number of units per batch sub-run
pub const DEFAULT_BATCH_SIZE: usize = 2;

/// Order in which batch sub-run outputs are concatenated
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BatchOrder {
    /// Whichever sub-run finishes first comes first
    Completion,
    /// Sub-runs appear in the order their sub-lists were cut
    Submission,
}

impl Default for BatchOrder {
    fn default() -> Self {
        BatchOrder::Completion
    }
}

/// Prompt templates with `${name}` placeholders
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PromptTemplates {
    /// Extraction system message: `${context}`, `${language}`, `${now}`
    pub extraction_system: String,

    /// Extraction user message: `${material}`, `${fields}`, `${extractedInfo}`
    pub extraction_user: String,

    /// Matching system message: `${taskInstruction}`, `${language}`, `${now}`
    pub matching_system: String,

    /// Matching user message: `${rule}`, `${context}`
    pub matching_user: String,
}

impl Default for PromptTemplates {
    fn default() -> Self {
        Self {
            extraction_system: EXTRACTION_SYSTEM.to_string(),
            extraction_user: EXTRACTION_USER.to_string(),
            matching_system: MATCHING_SYSTEM.to_string(),
            matching_user: MATCHING_USER.to_string(),
        }
    }
}

/// Configuration for extraction and matching runs
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Language the model should answer in
    pub language: String,

    /// Offset from UTC, in hours, used for the current-time string
    pub time_zone_offset_hours: f64,

    /// Log full system and user messages of every turn
    pub log_prompts: bool,

    /// Units per sub-run when the caller does not give a batch size
    pub default_batch_size: usize,

    /// Sub-runs allowed in flight at once
    pub max_concurrency: usize,

    /// How batch outputs are concatenated
    pub batch_order: BatchOrder,

    /// Prompt templates
    pub prompts: PromptTemplates,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            language: "English".to_string(),
            time_zone_offset_hours: 0.0,
            log_prompts: false,
            default_batch_size: DEFAULT_BATCH_SIZE,
            max_concurrency: 4,
            batch_order: BatchOrder::Completion,
            prompts: PromptTemplates::default(),
        }
    }
}

impl EngineConfig {
    /// Validate the configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.language.trim().is_empty() {
            return Err("language must not be empty".to_string());
        }
        if !(-12.0..=14.0).contains(&self.time_zone_offset_hours) {
            return Err(format!(
                "time_zone_offset_hours {} out of range [-12, 14]",
                self.time_zone_offset_hours
            ));
        }
        if self.default_batch_size == 0 {
            return Err("default_batch_size must be greater than 0".to_string());
        }
        if self.max_concurrency == 0 {
            return Err("max_concurrency must be greater than 0".to_string());
        }
        Ok(())
    }

    /// Batch size to use for a caller-supplied value
    ///
    /// Missing or zero falls back to `default_batch_size`, and to
    /// [`DEFAULT_BATCH_SIZE`] if that is zero too.
    pub fn effective_batch_size(&self, requested: Option<usize>) -> usize {
        requested
            .filter(|n| *n > 0)
            .or(Some(self.default_batch_size).filter(|n| *n > 0))
            .unwrap_or(DEFAULT_BATCH_SIZE)
    }

    /// Load configuration from TOML string
    pub fn from_toml(toml_str: &str) -> Result<Self, String> {
        toml::from_str(toml_str).map_err(|e| format!("Failed to parse TOML: {}", e))
    }

    /// Serialize configuration to TOML string
    pub fn to_toml(&self) -> Result<String, String> {
        toml::to_string_pretty(self).map_err(|e| format!("Failed to serialize to TOML: {}", e))
    }
}

const EXTRACTION_SYSTEM: &str = r#"
You are an information extraction assistant. Review the material you are given and extract the requested information.
${context}

You should:
1. Use ${language}
2. Read the material carefully
3. Extract the information that is still missing, following the field descriptions
4. Record what you found with the fillExtractedInfoTool
5. Be thorough and accurate

Current Time: ${now}

IMPORTANT: fillExtractedInfoTool takes the extracted information as a JSON object of key-value pairs where both keys and values are strings. Never pass an array.
Correct:
- extractedInfo: {"field1": "value1", "field2": "value2"}

Wrong:
- extractedInfo: ["field1", "value1", "field2", "value2"]

Materials are reviewed one at a time until all of them have been read.
"#;

const EXTRACTION_USER: &str = r#"
<current_material>
${material}
</current_material>

<fields_to_extract>
${fields}
</fields_to_extract>

<already_extracted>
${extractedInfo}
</already_extracted>
"#;

const MATCHING_SYSTEM: &str = r#"
You are a rule matcher. Review the context information and decide whether the given rule matches it.
${taskInstruction}

You should:
1. Use ${language}
2. Read the rule carefully
3. Always record your decision with RecordMatchRuleTool, whether or not the rule matches
4. Be thorough and accurate

Current Time: ${now}

Rules are checked one at a time until all of them have been checked.
"#;

const MATCHING_USER: &str = r#"
<current_rule>
${rule}
</current_rule>

<context>
${context}
</context>
"#;
