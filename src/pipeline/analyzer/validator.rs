//! Strict validation of oracle output.
//!
//! Oracles wrap JSON in markdown fences, prepend prose, emit bare arrays
//! instead of the envelope object, or hallucinate fields. The validator
//! normalizes the tolerated deviations (fences, prose, bare arrays) and
//! rejects everything else with a reason string. It never panics on
//! malformed input.

use std::collections::HashSet;
use std::fmt;

use serde_json::{Map, Value};

use crate::models::RigorLevel;

use super::types::{ExtractedItem, RawClassification};

/// Why an oracle payload was rejected. Carried up into the document's
/// error message, so the reason names the offending field and item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationFailure {
    pub reason: String,
}

impl ValidationFailure {
    fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

impl fmt::Display for ValidationFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.reason)
    }
}

const EXTRACTION_FIELDS: &[&str] = &["ordinal", "instructionText"];
const CLASSIFICATION_FIELDS: &[&str] = &[
    "ordinal",
    "standardCode",
    "rigor",
    "justification",
    "confidence",
];

/// Validate pass-1 output into extracted items.
pub fn parse_extraction_output(raw: &str) -> Result<Vec<ExtractedItem>, ValidationFailure> {
    let items = items_array(extract_payload(raw)?)?;
    if items.is_empty() {
        return Err(ValidationFailure::new("extraction returned no items"));
    }

    let mut seen = HashSet::new();
    let mut extracted = Vec::with_capacity(items.len());
    for (index, item) in items.iter().enumerate() {
        let object = require_object(item, index)?;
        reject_unknown_fields(object, EXTRACTION_FIELDS, index)?;

        let ordinal = require_integer(object, "ordinal", index)?;
        let instruction_text = require_string(object, "instructionText", index)?;

        if !seen.insert(ordinal) {
            return Err(ValidationFailure::new(format!(
                "duplicate ordinal {ordinal} in extraction output"
            )));
        }

        extracted.push(ExtractedItem {
            ordinal,
            instruction_text,
        });
    }
    Ok(extracted)
}

/// Validate pass-2 output into raw classification records. Duplicate
/// ordinals are tolerated here and resolved by the caller against the
/// pass-1 item list.
pub fn parse_classification_output(
    raw: &str,
) -> Result<Vec<RawClassification>, ValidationFailure> {
    let items = items_array(extract_payload(raw)?)?;

    let mut classifications = Vec::with_capacity(items.len());
    for (index, item) in items.iter().enumerate() {
        let object = require_object(item, index)?;
        reject_unknown_fields(object, CLASSIFICATION_FIELDS, index)?;

        let ordinal = require_integer(object, "ordinal", index)?;
        let standard_code = require_string(object, "standardCode", index)?;
        let rigor = parse_rigor(
            object
                .get("rigor")
                .ok_or_else(|| missing_field("rigor", index))?,
            index,
        )?;

        let justification = optional_string(object, "justification", index)?;
        let confidence = optional_number(object, "confidence", index)?;

        classifications.push(RawClassification {
            ordinal,
            standard_code,
            rigor,
            justification,
            confidence,
        });
    }
    Ok(classifications)
}

/// Slice a plausible JSON payload out of the raw completion: from an
/// opening `[` or `{` to the last matching closer. This strips markdown
/// fences and surrounding prose. Openers are tried left to right, so a
/// stray bracket in the prose (a citation like `[1]`, say) does not
/// poison the slice when real JSON follows it.
fn extract_payload(raw: &str) -> Result<Value, ValidationFailure> {
    let mut parse_error: Option<String> = None;
    let mut search = 0;

    while let Some(offset) = raw[search..].find(['[', '{']) {
        let start = search + offset;
        let closer = if raw.as_bytes()[start] == b'[' { ']' } else { '}' };

        if let Some(end) = raw.rfind(closer).filter(|&end| end > start) {
            match serde_json::from_str(&raw[start..=end]) {
                Ok(value) => return Ok(value),
                Err(e) => parse_error = Some(e.to_string()),
            }
        }
        search = start + 1;
    }

    Err(match parse_error {
        Some(e) => ValidationFailure::new(format!("malformed JSON payload: {e}")),
        None => ValidationFailure::new("no JSON payload in oracle output"),
    })
}

/// Normalize the two accepted top-level shapes, a bare array or an
/// `{"items": [...]}` envelope, down to the item list.
fn items_array(value: Value) -> Result<Vec<Value>, ValidationFailure> {
    match value {
        Value::Array(items) => Ok(items),
        Value::Object(mut object) => match object.remove("items") {
            Some(Value::Array(items)) => Ok(items),
            Some(_) => Err(ValidationFailure::new("'items' is not an array")),
            None => Err(ValidationFailure::new(
                "top-level object has no 'items' array",
            )),
        },
        _ => Err(ValidationFailure::new(
            "payload is neither an array nor an object",
        )),
    }
}

fn require_object<'a>(
    value: &'a Value,
    index: usize,
) -> Result<&'a Map<String, Value>, ValidationFailure> {
    value
        .as_object()
        .ok_or_else(|| ValidationFailure::new(format!("item {index} is not an object")))
}

fn reject_unknown_fields(
    object: &Map<String, Value>,
    allowed: &[&str],
    index: usize,
) -> Result<(), ValidationFailure> {
    for key in object.keys() {
        if !allowed.contains(&key.as_str()) {
            return Err(ValidationFailure::new(format!(
                "item {index} has unknown field '{key}'"
            )));
        }
    }
    Ok(())
}

fn missing_field(field: &str, index: usize) -> ValidationFailure {
    ValidationFailure::new(format!("item {index} is missing '{field}'"))
}

fn require_integer(
    object: &Map<String, Value>,
    field: &str,
    index: usize,
) -> Result<i64, ValidationFailure> {
    object
        .get(field)
        .ok_or_else(|| missing_field(field, index))?
        .as_i64()
        .ok_or_else(|| {
            ValidationFailure::new(format!("item {index}: '{field}' is not an integer"))
        })
}

fn require_string(
    object: &Map<String, Value>,
    field: &str,
    index: usize,
) -> Result<String, ValidationFailure> {
    let text = object
        .get(field)
        .ok_or_else(|| missing_field(field, index))?
        .as_str()
        .ok_or_else(|| {
            ValidationFailure::new(format!("item {index}: '{field}' is not a string"))
        })?;

    if text.trim().is_empty() {
        return Err(ValidationFailure::new(format!(
            "item {index}: '{field}' is empty"
        )));
    }
    Ok(text.to_string())
}

fn optional_string(
    object: &Map<String, Value>,
    field: &str,
    index: usize,
) -> Result<Option<String>, ValidationFailure> {
    match object.get(field) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(text)) => Ok(Some(text.clone())),
        Some(_) => Err(ValidationFailure::new(format!(
            "item {index}: '{field}' is not a string"
        ))),
    }
}

fn optional_number(
    object: &Map<String, Value>,
    field: &str,
    index: usize,
) -> Result<Option<f64>, ValidationFailure> {
    match object.get(field) {
        None | Some(Value::Null) => Ok(None),
        Some(value) => value.as_f64().map(Some).ok_or_else(|| {
            ValidationFailure::new(format!("item {index}: '{field}' is not a number"))
        }),
    }
}

/// Rigor arrives either as the numeric level 1..=3 or as a label.
fn parse_rigor(value: &Value, index: usize) -> Result<RigorLevel, ValidationFailure> {
    match value {
        Value::Number(_) => value
            .as_i64()
            .and_then(RigorLevel::from_level)
            .ok_or_else(|| {
                ValidationFailure::new(format!(
                    "item {index}: rigor must be 1, 2, or 3, got {value}"
                ))
            }),
        Value::String(label) => RigorLevel::from_wire_label(label).ok_or_else(|| {
            ValidationFailure::new(format!("item {index}: unknown rigor label '{label}'"))
        }),
        _ => Err(ValidationFailure::new(format!(
            "item {index}: rigor is neither a number nor a label"
        ))),
    }
}
