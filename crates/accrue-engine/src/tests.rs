//! Integration tests for extraction and matching runs

#[cfg(test)]
mod tests {
    use crate::{
        plan_batches, BatchOrder, EngineConfig, EngineError, ExtractionRequest, Extractor, MatchRequest,
        RuleMatcher, WorkerPool, EXTRACT_TOOL_NAME, MATCH_TOOL_NAME,
    };
    use accrue_domain::{FieldSpec, Material, Rule};
    use accrue_llm::MockModel;
    use proptest::prelude::*;
    use std::collections::BTreeMap;
    use std::sync::Arc;

    fn invoice_request(materials: Vec<Material>) -> ExtractionRequest {
        ExtractionRequest {
            context: "Supplier invoices".to_string(),
            materials,
            fields: vec![FieldSpec::new("amount", "Invoice total")],
        }
    }

    fn rules(n: usize) -> Vec<Rule> {
        (1..=n)
            .map(|i| Rule::new(format!("rule-{}", i), format!("Condition number {}", i)))
            .collect()
    }

    fn verdict_args(name: &str, matched: bool) -> String {
        format!(r#"{{"name":"{}","matched":{},"reason":"checked {}"}}"#, name, matched, name)
    }

    fn scripted_rules(n: usize) -> MockModel {
        let model = MockModel::new();
        script_rules(&model, n);
        model
    }

    fn script_rules(model: &MockModel, n: usize) {
        for i in 1..=n {
            let name = format!("rule-{}", i);
            model.add_tool_call_when(
                format!("Rule Name: {}\n", name),
                MATCH_TOOL_NAME,
                verdict_args(&name, i % 2 == 1),
            );
        }
    }

    #[tokio::test]
    async fn test_value_found_on_second_material() {
        let model = MockModel::new();
        model.push_text("Nothing useful on this page.");
        model.push_tool_call(
            EXTRACT_TOOL_NAME,
            r#"{"extractedInfo":{"amount":"100","amountReason":"Total line on page 2"}}"#,
        );

        let extractor = Extractor::from_arc(Arc::new(model.clone()), EngineConfig::default());
        let output = extractor
            .extract(&invoice_request(vec![
                Material::new("Cover letter", "page-1"),
                Material::new("Total due: 100", "page-2"),
            ]))
            .await
            .unwrap();

        let expected: BTreeMap<String, String> = [("amount".to_string(), "100".to_string())].into();
        assert_eq!(output.fields, expected);
        assert_eq!(output.reasons["amount"], "Total line on page 2");
        assert_eq!(model.call_count(), 2);
    }

    #[tokio::test]
    async fn test_state_is_fed_into_next_prompt() {
        let model = MockModel::new();
        model.push_tool_call(EXTRACT_TOOL_NAME, r#"{"extractedInfo":{"amount":"100"}}"#);
        model.push_text("done");

        let extractor = Extractor::from_arc(Arc::new(model.clone()), EngineConfig::default());
        extractor
            .extract(&invoice_request(vec![Material::new("a", "1"), Material::new("b", "2")]))
            .await
            .unwrap();

        let prompts = model.prompts();
        assert!(prompts[0][1].content.contains("<already_extracted>\n{}\n</already_extracted>"));
        assert!(prompts[1][1]
            .content
            .contains(r#"{"amount":"100","amountReason":""}"#));
        assert!(prompts[1][1].content.contains("Material 2 (Source: 2):\nb"));
    }

    #[tokio::test]
    async fn test_resolved_value_is_not_retracted() {
        let model = MockModel::new();
        model.push_tool_call(EXTRACT_TOOL_NAME, r#"{"extractedInfo":{"amount":"100","amountReason":"p1"}}"#);
        model.push_tool_call(EXTRACT_TOOL_NAME, r#"{"extractedInfo":{"amount":"","amountReason":"not here"}}"#);

        let extractor = Extractor::new(model, EngineConfig::default());
        let output = extractor
            .extract(&invoice_request(vec![Material::new("a", "1"), Material::new("b", "2")]))
            .await
            .unwrap();

        assert_eq!(output.fields["amount"], "100");
        assert_eq!(output.reasons["amount"], "p1");
    }

    #[tokio::test]
    async fn test_one_call_per_material() {
        let model = MockModel::new();
        let extractor = Extractor::from_arc(Arc::new(model.clone()), EngineConfig::default());
        let materials = (0..3).map(|i| Material::new(format!("page {}", i), "doc")).collect();

        let output = extractor.extract(&invoice_request(materials)).await.unwrap();

        assert_eq!(model.call_count(), 3);
        assert_eq!(output.fields["amount"], "");
        assert_eq!(output.reasons["amount"], "");
    }

    #[tokio::test]
    async fn test_empty_material_list_makes_no_calls() {
        let model = MockModel::new();
        let extractor = Extractor::from_arc(Arc::new(model.clone()), EngineConfig::default());

        let output = extractor.extract(&invoice_request(vec![])).await.unwrap();

        assert_eq!(model.call_count(), 0);
        assert_eq!(output.fields.len(), 1);
        assert_eq!(output.fields["amount"], "");
    }

    #[tokio::test]
    async fn test_malformed_payload_is_absorbed() {
        let model = MockModel::new();
        model.push_tool_call(EXTRACT_TOOL_NAME, "this is not json");
        model.push_tool_call(EXTRACT_TOOL_NAME, r#"{"extractedInfo":["amount","100"]}"#);
        model.push_tool_call(EXTRACT_TOOL_NAME, r#"{"extractedInfo":{"amount":"42"}}"#);

        let extractor = Extractor::from_arc(Arc::new(model.clone()), EngineConfig::default());
        let materials = (0..3).map(|i| Material::new(format!("page {}", i), "doc")).collect();
        let output = extractor.extract(&invoice_request(materials)).await.unwrap();

        assert_eq!(output.fields["amount"], "42");
        assert_eq!(model.call_count(), 3);
    }

    #[tokio::test]
    async fn test_model_failure_aborts_run() {
        let model = MockModel::new();
        model.push_tool_call(EXTRACT_TOOL_NAME, r#"{"extractedInfo":{"amount":"100"}}"#);
        model.push_error("connection reset");

        let extractor = Extractor::from_arc(Arc::new(model.clone()), EngineConfig::default());
        let materials = (0..3).map(|i| Material::new(format!("page {}", i), "doc")).collect();
        let result = extractor.extract(&invoice_request(materials)).await;

        assert!(matches!(result, Err(EngineError::Model(msg)) if msg.contains("connection reset")));
        assert_eq!(model.call_count(), 2);
    }

    #[tokio::test]
    async fn test_reserved_field_name_rejected() {
        let model = MockModel::new();
        let extractor = Extractor::from_arc(Arc::new(model.clone()), EngineConfig::default());
        let mut request = invoice_request(vec![Material::new("a", "1")]);
        request.fields.push(FieldSpec::new("totalReason", "why"));

        let result = extractor.extract(&request).await;

        assert!(matches!(result, Err(EngineError::ReservedField(name)) if name == "totalReason"));
        assert_eq!(model.call_count(), 0);
    }

    #[tokio::test]
    async fn test_tool_registration_failure_is_fatal() {
        let model = MockModel::new().rejecting_tools("tools are not supported by this model");
        let extractor = Extractor::from_arc(Arc::new(model.clone()), EngineConfig::default());

        let result = extractor.extract(&invoice_request(vec![Material::new("a", "1")])).await;

        assert!(matches!(result, Err(EngineError::ToolRegistration(_))));
        assert_eq!(model.call_count(), 0);
    }

    #[tokio::test]
    async fn test_invalid_config_rejected() {
        let config = EngineConfig {
            language: String::new(),
            ..EngineConfig::default()
        };
        let extractor = Extractor::new(MockModel::new(), config);
        let result = extractor.extract(&invoice_request(vec![Material::new("a", "1")])).await;
        assert!(matches!(result, Err(EngineError::Config(_))));
    }

    #[tokio::test]
    async fn test_extraction_without_requested_fields() {
        let model = MockModel::new();
        model.push_tool_call(
            EXTRACT_TOOL_NAME,
            r#"{"extractedInfo":{"vendor":"Acme","vendorReason":"letterhead"}}"#,
        );

        let extractor = Extractor::from_arc(Arc::new(model.clone()), EngineConfig::default());
        let request = ExtractionRequest {
            context: String::new(),
            materials: vec![Material::new("ACME Ltd.", "letter")],
            fields: vec![],
        };
        let output = extractor.extract(&request).await.unwrap();

        assert!(model.prompts()[0][1].content.contains("No specific fields specified"));
        assert_eq!(output.fields["vendor"], "Acme");
        assert_eq!(output.reasons["vendor"], "letterhead");
    }

    #[tokio::test]
    async fn test_sequential_matching() {
        let model = scripted_rules(3);
        let matcher = RuleMatcher::from_arc(Arc::new(model.clone()), EngineConfig::default());
        let request = MatchRequest {
            task_instruction: "Only match on explicit evidence".to_string(),
            context: "Customer since 2019".to_string(),
            rules: rules(3),
        };

        let output = matcher.check(&request).await.unwrap();

        let names: Vec<_> = output.verdicts.iter().map(|v| v.name.as_str()).collect();
        assert_eq!(names, ["rule-1", "rule-2", "rule-3"]);
        assert_eq!(output.matched().count(), 2);
        assert_eq!(model.call_count(), 3);
        assert!(model.prompts()[0][0].content.contains("Only match on explicit evidence"));
    }

    #[tokio::test]
    async fn test_matching_skips_turns_without_verdict() {
        let model = MockModel::new();
        model.push_tool_call(MATCH_TOOL_NAME, verdict_args("rule-1", true));
        model.push_text("I am not sure");

        let matcher = RuleMatcher::new(model, EngineConfig::default());
        let request = MatchRequest {
            rules: rules(2),
            ..MatchRequest::default()
        };
        let output = matcher.check(&request).await.unwrap();
        assert_eq!(output.verdicts.len(), 1);
    }

    #[tokio::test]
    async fn test_parallel_five_rules_in_batches_of_two() {
        let model = scripted_rules(5);
        let matcher = RuleMatcher::from_arc(Arc::new(model.clone()), EngineConfig::default());
        let request = MatchRequest {
            rules: rules(5),
            ..MatchRequest::default()
        };

        let sizes: Vec<_> = plan_batches(&request.rules, 2).iter().map(Vec::len).collect();
        assert_eq!(sizes, [2, 2, 1]);

        let output = matcher
            .check_parallel(&request, Some(2), &WorkerPool::new(3))
            .await
            .unwrap();

        assert_eq!(output.verdicts.len(), 5);
        assert_eq!(model.call_count(), 5);
        let mut names: Vec<_> = output.verdicts.iter().map(|v| v.name.clone()).collect();
        names.sort();
        assert_eq!(names, ["rule-1", "rule-2", "rule-3", "rule-4", "rule-5"]);
    }

    #[tokio::test]
    async fn test_parallel_submission_order() {
        let model = scripted_rules(5);
        let config = EngineConfig {
            batch_order: BatchOrder::Submission,
            ..EngineConfig::default()
        };
        let matcher = RuleMatcher::new(model, config);
        let request = MatchRequest {
            rules: rules(5),
            ..MatchRequest::default()
        };

        let output = matcher.check_parallel(&request, None, &WorkerPool::new(2)).await.unwrap();

        let names: Vec<_> = output.verdicts.iter().map(|v| v.name.as_str()).collect();
        assert_eq!(names, ["rule-1", "rule-2", "rule-3", "rule-4", "rule-5"]);
    }

    #[tokio::test]
    async fn test_parallel_fails_fast() {
        let model = MockModel::new();
        model.add_error_when("Rule Name: rule-3\n", "upstream timeout");
        script_rules(&model, 6);
        let matcher = RuleMatcher::new(model, EngineConfig::default());
        let request = MatchRequest {
            rules: rules(6),
            ..MatchRequest::default()
        };

        let result = matcher.check_parallel(&request, Some(2), &WorkerPool::new(3)).await;

        assert!(matches!(result, Err(EngineError::Model(msg)) if msg.contains("upstream timeout")));
    }

    #[tokio::test]
    async fn test_parallel_empty_rules() {
        let model = MockModel::new();
        let matcher = RuleMatcher::from_arc(Arc::new(model.clone()), EngineConfig::default());
        let pool = matcher.default_pool();

        let output = matcher
            .check_parallel(&MatchRequest::default(), Some(2), &pool)
            .await
            .unwrap();

        assert!(output.verdicts.is_empty());
        assert_eq!(model.call_count(), 0);
    }

    proptest! {
        #[test]
        fn prop_one_model_call_per_unit(n in 0usize..6) {
            let runtime = tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()
                .unwrap();
            let model = MockModel::new();
            let extractor = Extractor::from_arc(Arc::new(model.clone()), EngineConfig::default());
            let materials = (0..n).map(|i| Material::new(format!("page {}", i), "doc")).collect();

            let output = runtime.block_on(extractor.extract(&invoice_request(materials))).unwrap();

            prop_assert_eq!(model.call_count(), n);
            prop_assert_eq!(output.fields.keys().cloned().collect::<Vec<_>>(), vec!["amount".to_string()]);
        }
    }
}
