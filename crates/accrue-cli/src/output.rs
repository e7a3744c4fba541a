//! Output formatting for the CLI.

use crate::config::OutputFormat;
use crate::error::Result;
use accrue_engine::{ExtractionOutput, MatchOutput};
use colored::*;
use tabled::{
    builder::Builder,
    settings::{object::Rows, Alignment, Modify, Style},
};

/// Output formatter.
pub struct Formatter {
    format: OutputFormat,
    color_enabled: bool,
}

impl Formatter {
    /// Create a new formatter.
    pub fn new(format: OutputFormat, color_enabled: bool) -> Self {
        Self {
            format,
            color_enabled,
        }
    }

    /// Format the result of an extraction run.
    pub fn format_extraction(&self, output: &ExtractionOutput) -> Result<String> {
        match self.format {
            OutputFormat::Json => Ok(serde_json::to_string_pretty(output)?),
            OutputFormat::Table => Ok(self.extraction_table(output)),
        }
    }

    /// Format the result of a matching run.
    pub fn format_verdicts(&self, output: &MatchOutput) -> Result<String> {
        match self.format {
            OutputFormat::Json => Ok(serde_json::to_string_pretty(output)?),
            OutputFormat::Table => Ok(self.verdict_table(output)),
        }
    }

    fn extraction_table(&self, output: &ExtractionOutput) -> String {
        if output.fields.is_empty() {
            return self.colorize("No fields extracted.", "yellow");
        }

        let mut builder = Builder::default();
        builder.push_record(["Field", "Value", "Reason"]);
        for (name, value) in &output.fields {
            let reason = output.reasons.get(name).map(String::as_str).unwrap_or_default();
            let value = if value.is_empty() {
                self.colorize("(not found)", "yellow")
            } else {
                value.clone()
            };
            builder.push_record([name.as_str(), value.as_str(), reason]);
        }

        self.render(builder)
    }

    fn verdict_table(&self, output: &MatchOutput) -> String {
        if output.verdicts.is_empty() {
            return self.colorize("No verdicts recorded.", "yellow");
        }

        let mut builder = Builder::default();
        builder.push_record(["Rule", "Matched", "Reason"]);
        for verdict in &output.verdicts {
            let matched = if verdict.matched {
                self.colorize("✓ yes", "green")
            } else {
                self.colorize("✗ no", "red")
            };
            builder.push_record([verdict.name.as_str(), matched.as_str(), verdict.reason.as_str()]);
        }

        self.render(builder)
    }

    fn render(&self, builder: Builder) -> String {
        let mut table = builder.build();
        table
            .with(Style::rounded())
            .with(Modify::new(Rows::first()).with(Alignment::center()));
        table.to_string()
    }

    /// Format a success message.
    pub fn success(&self, message: &str) -> String {
        self.colorize(&format!("✓ {}", message), "green")
    }

    /// Colorize text if color is enabled.
    fn colorize(&self, text: &str, color: &str) -> String {
        if !self.color_enabled {
            return text.to_string();
        }

        match color {
            "red" => text.red().to_string(),
            "green" => text.green().to_string(),
            "yellow" => text.yellow().to_string(),
            _ => text.to_string(),
        }
    }
}
