//! Field module - output slots requested from the model during extraction
//!
//! Every requested field travels with a companion reason field named
//! `<name>Reason`. The model fills both; the reason records how the value was
//! found (or why it could not be).

use serde::{Deserialize, Serialize};

/// Suffix reserved for companion reason fields
pub const REASON_SUFFIX: &str = "Reason";

/// A named output slot to fill
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldSpec {
    /// Field name, used as the key in the extracted map
    pub name: String,

    /// Human-readable description of what to extract
    #[serde(default)]
    pub description: String,

    /// Optional example value shown to the model
    #[serde(default)]
    pub example: String,
}

impl FieldSpec {
    /// Create a field without an example
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            example: String::new(),
        }
    }

    /// Attach an example value
    pub fn with_example(mut self, example: impl Into<String>) -> Self {
        self.example = example.into();
        self
    }

    /// Whether this field's name collides with the reserved reason suffix
    pub fn is_reason(&self) -> bool {
        is_reason_name(&self.name)
    }

    /// The synthetic companion that records the justification for this field
    pub fn reason_companion(&self) -> FieldSpec {
        FieldSpec {
            name: reason_name(&self.name),
            description: format!("Based on what and how you extract field {}", self.name),
            example: String::new(),
        }
    }
}

/// Name of the reason field paired with `name`
pub fn reason_name(name: &str) -> String {
    format!("{}{}", name, REASON_SUFFIX)
}

/// Whether `name` is a reason field name
pub fn is_reason_name(name: &str) -> bool {
    name.ends_with(REASON_SUFFIX)
}

/// Expand the caller's fields with their reason companions
///
/// Companions come first, then the caller's fields in their original order.
pub fn with_reason_fields(fields: &[FieldSpec]) -> Vec<FieldSpec> {
    fields
        .iter()
        .map(FieldSpec::reason_companion)
        .chain(fields.iter().cloned())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_reason_companion() {
        let field = FieldSpec::new("amount", "Invoice total");
        let reason = field.reason_companion();
        assert_eq!(reason.name, "amountReason");
        assert!(reason.description.contains("amount"));
        assert!(reason.is_reason());
        assert!(!field.is_reason());
    }

    #[test]
    fn test_with_reason_fields_order() {
        let fields = vec![
            FieldSpec::new("amount", "Invoice total"),
            FieldSpec::new("currency", "ISO code").with_example("USD"),
        ];
        let all = with_reason_fields(&fields);
        let names: Vec<_> = all.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, ["amountReason", "currencyReason", "amount", "currency"]);
        assert_eq!(all[3].example, "USD");
    }

    #[test]
    fn test_with_reason_fields_empty() {
        assert!(with_reason_fields(&[]).is_empty());
    }

    proptest! {
        #[test]
        fn prop_reason_name_is_reason(name in "[a-zA-Z]{1,16}") {
            prop_assert!(is_reason_name(&reason_name(&name)));
            prop_assert!(reason_name(&name).starts_with(&name));
        }
    }
}
