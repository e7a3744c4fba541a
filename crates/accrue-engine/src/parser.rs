//! Parse the tool invocation of one turn
//!
//! Models wrap JSON in markdown fences, double-encode objects and put numbers
//! where strings were asked for. Everything here is lenient about that and
//! strict about shape: anything that is not the expected object is a
//! [`PayloadError`], which the engine absorbs as an empty turn.

use accrue_domain::{Message, Role, Verdict};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use thiserror::Error;

/// A tool payload that could not be understood
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Malformed tool payload: {0}")]
pub struct PayloadError(pub String);

/// Payload of the first tool message produced by `tool`, if any
pub fn locate_payload<'a>(messages: &'a [Message], tool: &str) -> Option<&'a str> {
    messages
        .iter()
        .find(|m| m.role == Role::Tool && m.tool_name.as_deref() == Some(tool))
        .map(|m| m.content.as_str())
}

/// Strip a surrounding markdown code block, if there is one
fn strip_code_fence(raw: &str) -> &str {
    let trimmed = raw.trim();
    if !trimmed.starts_with("```") {
        return trimmed;
    }

    // Skip the opening line (``` or ```json) and a closing ``` if present
    let body = trimmed.split_once('\n').map(|(_, rest)| rest).unwrap_or("");
    body.trim_end().strip_suffix("```").unwrap_or(body).trim()
}

/// Parse `raw` as a JSON object, tolerating fences and surrounding prose
pub fn parse_object(raw: &str) -> Result<Map<String, Value>, PayloadError> {
    let body = strip_code_fence(raw);
    let value = match serde_json::from_str::<Value>(body) {
        Ok(value) => value,
        Err(first) => {
            let (Some(start), Some(end)) = (body.find('{'), body.rfind('}')) else {
                return Err(PayloadError(format!("JSON parse error: {}", first)));
            };
            if start >= end {
                return Err(PayloadError(format!("JSON parse error: {}", first)));
            }
            serde_json::from_str::<Value>(&body[start..=end])
                .map_err(|e| PayloadError(format!("JSON parse error: {}", e)))?
        }
    };

    match value {
        Value::Object(map) => Ok(map),
        other => Err(PayloadError(format!("Expected JSON object, got {}", kind_of(&other)))),
    }
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

fn value_to_string(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        Value::Array(_) | Value::Object(_) => value.to_string(),
    }
}

/// Parse the extraction tool payload into field values
///
/// Accepts `{"extractedInfo": {...}}` or the bare object. A string-encoded
/// `extractedInfo` object is decoded; an array is rejected.
pub fn parse_extracted(payload: &str) -> Result<BTreeMap<String, String>, PayloadError> {
    let mut object = parse_object(payload)?;

    let info = match object.remove("extractedInfo") {
        None => Value::Object(object),
        Some(Value::Null) => return Ok(BTreeMap::new()),
        Some(Value::String(encoded)) => Value::Object(parse_object(&encoded)?),
        Some(value) => value,
    };

    match info {
        Value::Object(map) => Ok(map.iter().map(|(k, v)| (k.clone(), value_to_string(v))).collect()),
        other => Err(PayloadError(format!(
            "extractedInfo must be an object, got {}",
            kind_of(&other)
        ))),
    }
}

/// Parse the matching tool payload into a verdict
///
/// `matched` may be a boolean or the strings "true"/"false"; when missing the
/// rule is treated as not matched.
pub fn parse_verdict(payload: &str) -> Result<Verdict, PayloadError> {
    let object = parse_object(payload)?;

    let matched = match object.get("matched") {
        None | Some(Value::Null) => false,
        Some(Value::Bool(b)) => *b,
        Some(Value::String(s)) if s.eq_ignore_ascii_case("true") => true,
        Some(Value::String(s)) if s.eq_ignore_ascii_case("false") => false,
        Some(other) => {
            return Err(PayloadError(format!(
                "matched must be a boolean, got {}",
                value_to_string(other)
            )))
        }
    };

    Ok(Verdict {
        name: object.get("name").map(value_to_string).unwrap_or_default(),
        matched,
        reason: object.get("reason").map(value_to_string).unwrap_or_default(),
    })
}
