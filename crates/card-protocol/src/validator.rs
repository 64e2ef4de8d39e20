use crate::schema::{CardSchema, FieldSpec, FieldType};
use crate::CapabilityCard;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One schema violation found in a draft card.
///
/// Violations are data, not errors: they drive the repair loop.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SchemaViolation {
    /// The offending field, or "$" for the draft as a whole
    pub field: String,
    pub message: String,
}

impl SchemaViolation {
    fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl std::fmt::Display for SchemaViolation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Strip a Markdown code fence around a draft, if present.
///
/// Completion services routinely wrap JSON in ```json fences.
pub fn strip_code_fences(draft: &str) -> &str {
    let trimmed = draft.trim();
    if let Some(start) = trimmed.find("```") {
        let after = &trimmed[start + 3..];
        // Skip an optional language tag on the fence line
        let body_start = after.find('\n').map(|p| p + 1).unwrap_or(0);
        let body = &after[body_start..];
        if let Some(end) = body.rfind("```") {
            return body[..end].trim();
        }
    }
    trimmed
}

/// Validate a draft against the schema.
///
/// On success returns the immutable [`CapabilityCard`]; on failure the
/// ordered list of violations, in schema field order.
pub fn validate_draft(
    draft: &str,
    schema: &CardSchema,
) -> Result<CapabilityCard, Vec<SchemaViolation>> {
    let body = strip_code_fences(draft);

    let value: Value = match serde_json::from_str(body) {
        Ok(value) => value,
        Err(e) => {
            return Err(vec![SchemaViolation::new(
                "$",
                format!("draft is not valid JSON: {e}"),
            )]);
        }
    };

    let Some(object) = value.as_object() else {
        return Err(vec![SchemaViolation::new(
            "$",
            "draft must be a JSON object",
        )]);
    };

    let mut violations = Vec::new();

    for spec in &schema.fields {
        match object.get(&spec.name) {
            None | Some(Value::Null) => {
                if spec.required {
                    violations.push(SchemaViolation::new(
                        &spec.name,
                        format!("required field is missing (expected {})", spec.field_type.as_str()),
                    ));
                }
            }
            Some(field_value) => check_field(spec, field_value, &mut violations),
        }
    }

    // The schema is closed: fields it does not name are violations
    for key in object.keys() {
        if schema.field(key).is_none() {
            violations.push(SchemaViolation::new(
                key,
                "unknown field, not part of the card schema",
            ));
        }
    }

    if !violations.is_empty() {
        return Err(violations);
    }

    match serde_json::from_value::<CapabilityCard>(value) {
        Ok(card) => Ok(card),
        Err(e) => Err(vec![SchemaViolation::new(
            "$",
            format!("draft does not deserialize as a card: {e}"),
        )]),
    }
}

fn check_field(spec: &FieldSpec, value: &Value, violations: &mut Vec<SchemaViolation>) {
    match spec.field_type {
        FieldType::String => match value.as_str() {
            Some(s) if spec.required && s.trim().is_empty() => violations.push(
                SchemaViolation::new(&spec.name, "must be a non-empty string"),
            ),
            Some(_) => {}
            None => violations.push(SchemaViolation::new(&spec.name, "must be a string")),
        },
        FieldType::StringList => {
            let Some(items) = value.as_array() else {
                violations.push(SchemaViolation::new(&spec.name, "must be an array of strings"));
                return;
            };
            for (idx, item) in items.iter().enumerate() {
                let Some(s) = item.as_str() else {
                    violations.push(SchemaViolation::new(
                        format!("{}[{idx}]", spec.name),
                        "must be a string",
                    ));
                    continue;
                };
                if let Some(vocabulary) = &spec.closed_vocabulary {
                    let lowered = s.to_lowercase();
                    if !vocabulary.iter().any(|v| v.to_lowercase() == lowered) {
                        violations.push(SchemaViolation::new(
                            format!("{}[{idx}]", spec.name),
                            format!(
                                "`{s}` is not in the allowed vocabulary: {}",
                                vocabulary.join(", ")
                            ),
                        ));
                    }
                }
            }
        }
        FieldType::InputList => check_record_list(spec, value, true, violations),
        FieldType::OutputList => check_record_list(spec, value, false, violations),
    }
}

fn check_record_list(
    spec: &FieldSpec,
    value: &Value,
    name_required: bool,
    violations: &mut Vec<SchemaViolation>,
) {
    let Some(items) = value.as_array() else {
        violations.push(SchemaViolation::new(&spec.name, "must be an array of records"));
        return;
    };

    for (idx, item) in items.iter().enumerate() {
        let Some(record) = item.as_object() else {
            violations.push(SchemaViolation::new(
                format!("{}[{idx}]", spec.name),
                "must be an object",
            ));
            continue;
        };

        if name_required && !record.get("name").is_some_and(Value::is_string) {
            violations.push(SchemaViolation::new(
                format!("{}[{idx}]", spec.name),
                "record requires a string `name`",
            ));
        }

        for key in ["name", "type", "description"] {
            if let Some(field_value) = record.get(key) {
                if !field_value.is_string() && !field_value.is_null() {
                    violations.push(SchemaViolation::new(
                        format!("{}[{idx}].{key}", spec.name),
                        "must be a string",
                    ));
                }
            }
        }
    }
}
