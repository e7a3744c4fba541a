//! Extract command implementation.

use crate::cli::ExtractArgs;
use crate::config::Config;
use crate::error::Result;
use crate::output::Formatter;
use accrue_domain::ChatModel;
use accrue_engine::{ExtractionRequest, Extractor};
use std::fs;
use std::sync::Arc;

/// Execute the extract command, returning the rendered result.
pub async fn execute_extract<M>(
    args: &ExtractArgs,
    model: Arc<M>,
    config: &Config,
    formatter: &Formatter,
) -> Result<String>
where
    M: ChatModel + 'static,
{
    let request: ExtractionRequest = serde_json::from_str(&fs::read_to_string(&args.input)?)?;

    let extractor = Extractor::from_arc(model, config.engine.clone());
    let output = extractor.extract(&request).await?;
    formatter.format_extraction(&output)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::OutputFormat;
    use crate::error::CliError;
    use accrue_engine::{EngineError, ExtractionOutput, EXTRACT_TOOL_NAME};
    use accrue_llm::MockModel;
    use tempfile::NamedTempFile;

    fn input(json: &str) -> NamedTempFile {
        let file = NamedTempFile::new().unwrap();
        fs::write(file.path(), json).unwrap();
        file
    }

    #[tokio::test]
    async fn test_extract_from_file() {
        let file = input(
            r#"{
                "context": "Supplier invoices",
                "materials": [
                    {"content": "Dear customer", "source": "page-1"},
                    {"content": "Total: 100 EUR", "source": "page-2"}
                ],
                "fields": [{"name": "amount", "description": "Invoice total"}]
            }"#,
        );
        let model = MockModel::new();
        model.push_text("nothing here");
        model.push_tool_call(EXTRACT_TOOL_NAME, r#"{"extractedInfo":{"amount":"100","amountReason":"page 2"}}"#);

        let args = ExtractArgs {
            input: file.path().to_path_buf(),
        };
        let rendered = execute_extract(
            &args,
            Arc::new(model.clone()),
            &Config::default(),
            &Formatter::new(OutputFormat::Json, false),
        )
        .await
        .unwrap();

        let output: ExtractionOutput = serde_json::from_str(&rendered).unwrap();
        assert_eq!(output.fields["amount"], "100");
        assert_eq!(model.call_count(), 2);
    }

    #[tokio::test]
    async fn test_extract_empty_materials() {
        let file = input(r#"{"materials": [], "fields": [{"name": "amount"}]}"#);
        let args = ExtractArgs {
            input: file.path().to_path_buf(),
        };
        let model = MockModel::new();
        let rendered = execute_extract(
            &args,
            Arc::new(model.clone()),
            &Config::default(),
            &Formatter::new(OutputFormat::Json, false),
        )
        .await
        .unwrap();

        let output: ExtractionOutput = serde_json::from_str(&rendered).unwrap();
        assert_eq!(output.fields["amount"], "");
        assert_eq!(model.call_count(), 0);
    }

    #[tokio::test]
    async fn test_extract_reserved_field() {
        let file = input(r#"{"materials": [{"content": "x"}], "fields": [{"name": "idReason"}]}"#);
        let args = ExtractArgs {
            input: file.path().to_path_buf(),
        };
        let result = execute_extract(
            &args,
            Arc::new(MockModel::new()),
            &Config::default(),
            &Formatter::new(OutputFormat::Table, false),
        )
        .await;
        assert!(matches!(result, Err(CliError::Engine(EngineError::ReservedField(_)))));
    }
}
