//! Prompt composition for extraction and matching turns
//!
//! A composer turns the cursor, the unit list and the state accumulated so
//! far into the system and user messages of the next turn. Past the end of
//! the list it answers [`Composed::NoMoreInput`] instead.

use crate::config::PromptTemplates;
use accrue_domain::{render_template, FieldSpec, Material, Message, Rule};
use chrono::{DateTime, FixedOffset, Utc};
use std::collections::BTreeMap;

/// Outcome of composing one turn
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Composed {
    /// Messages for the next model call
    Turn {
        /// System message
        system: Message,
        /// User message
        user: Message,
    },

    /// The cursor is past the last unit
    NoMoreInput,
}

impl Composed {
    /// Messages to send, empty for [`Composed::NoMoreInput`]
    pub fn into_messages(self) -> Vec<Message> {
        match self {
            Composed::Turn { system, user } => vec![system, user],
            Composed::NoMoreInput => Vec::new(),
        }
    }
}

/// Numbered listing of the fields to extract
pub fn format_fields(fields: &[FieldSpec]) -> String {
    if fields.is_empty() {
        return "No specific fields specified. Extract all relevant information.".to_string();
    }

    let mut listing = String::new();
    for (i, field) in fields.iter().enumerate() {
        if field.example.is_empty() {
            listing.push_str(&format!("{}. {}: {}\n", i + 1, field.name, field.description));
        } else {
            listing.push_str(&format!(
                "{}. {}: {} (E.g., {})\n",
                i + 1,
                field.name,
                field.description,
                field.example.replace('\n', "\n ")
            ));
        }
    }
    listing
}

/// Block describing the material at `index`
pub fn format_material(index: usize, material: &Material) -> String {
    format!(
        "Material {} (Source: {}):\n{}\n",
        index + 1,
        material.source,
        material.content
    )
}

/// Block describing a rule
pub fn format_rule(rule: &Rule) -> String {
    format!("Rule Name: {}\nRule Content: {}\n", rule.name, rule.content)
}

/// Current time in the given UTC offset
pub fn current_time(offset_hours: f64) -> String {
    format_time(Utc::now(), offset_hours)
}

/// Render `at` in the given UTC offset, falling back to UTC for offsets
/// chrono cannot represent
pub fn format_time(at: DateTime<Utc>, offset_hours: f64) -> String {
    const FORMAT: &str = "%Y-%m-%d %H:%M:%S (UTC%:z)";

    let seconds = (offset_hours * 3600.0).round() as i32;
    match FixedOffset::east_opt(seconds) {
        Some(offset) => at.with_timezone(&offset).format(FORMAT).to_string(),
        None => at.format(FORMAT).to_string(),
    }
}

/// Composer for extraction turns
#[derive(Debug, Clone)]
pub struct ExtractionPrompt {
    system_template: String,
    user_template: String,
    language: String,
    context: String,
    fields: String,
}

impl ExtractionPrompt {
    /// Build a composer; `fields` should already include reason companions
    pub fn new(templates: &PromptTemplates, language: &str, context: &str, fields: &[FieldSpec]) -> Self {
        Self {
            system_template: templates.extraction_system.clone(),
            user_template: templates.extraction_user.clone(),
            language: language.to_string(),
            context: context.to_string(),
            fields: format_fields(fields),
        }
    }

    /// Compose the turn for the material under `cursor`
    pub fn compose(
        &self,
        cursor: usize,
        materials: &[Material],
        extracted: &BTreeMap<String, String>,
        now: &str,
    ) -> Composed {
        let Some(material) = materials.get(cursor) else {
            return Composed::NoMoreInput;
        };

        let context = if self.context.is_empty() {
            String::new()
        } else {
            format!("\n{}", self.context)
        };
        let extracted = serde_json::to_string(extracted).unwrap_or_else(|_| "{}".to_string());
        let material = format_material(cursor, material);

        let system = render_template(
            &self.system_template,
            &[("context", &context), ("language", &self.language), ("now", now)],
        );
        let user = render_template(
            &self.user_template,
            &[
                ("material", &material),
                ("fields", &self.fields),
                ("extractedInfo", &extracted),
            ],
        );

        Composed::Turn {
            system: Message::system(system.trim()),
            user: Message::user(user.trim()),
        }
    }
}

/// Composer for matching turns
#[derive(Debug, Clone)]
pub struct MatchingPrompt {
    system_template: String,
    user_template: String,
    language: String,
    task_instruction: String,
    context: String,
}

impl MatchingPrompt {
    /// Build a composer
    pub fn new(templates: &PromptTemplates, language: &str, task_instruction: &str, context: &str) -> Self {
        Self {
            system_template: templates.matching_system.clone(),
            user_template: templates.matching_user.clone(),
            language: language.to_string(),
            task_instruction: task_instruction.to_string(),
            context: context.to_string(),
        }
    }

    /// Compose the turn for the rule under `cursor`
    pub fn compose(&self, cursor: usize, rules: &[Rule], now: &str) -> Composed {
        let Some(rule) = rules.get(cursor) else {
            return Composed::NoMoreInput;
        };

        let rule = format_rule(rule);
        let system = render_template(
            &self.system_template,
            &[
                ("taskInstruction", &self.task_instruction),
                ("language", &self.language),
                ("now", now),
            ],
        );
        let user = render_template(&self.user_template, &[("rule", &rule), ("context", &self.context)]);

        Composed::Turn {
            system: Message::system(system.trim()),
            user: Message::user(user.trim()),
        }
    }
}
