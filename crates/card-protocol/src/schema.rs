use crate::CARD_SCHEMA_VERSION;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::path::Path;
use thiserror::Error;

/// Errors raised while loading or checking a schema definition
#[derive(Error, Debug)]
pub enum SchemaError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Schema is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid schema: {0}")]
    Invalid(String),
}

/// Primitive shape of one card field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldType {
    /// Non-empty string
    String,
    /// Array of strings
    StringList,
    /// Array of input records ({name, type?, description?})
    InputList,
    /// Array of output records ({name?, type?, description?})
    OutputList,
}

impl FieldType {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::String => "string",
            Self::StringList => "list of strings",
            Self::InputList => "list of {name, type?, description?} records",
            Self::OutputList => "list of {name?, type?, description?} records",
        }
    }
}

/// One field of the card schema
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FieldSpec {
    pub name: String,

    #[serde(rename = "type")]
    pub field_type: FieldType,

    pub required: bool,

    /// Closed vocabulary for StringList items (case-insensitive match)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub closed_vocabulary: Option<Vec<String>>,
}

/// The fixed, versioned card schema.
///
/// External configuration: loadable from a JSON file, with a built-in
/// default mirroring the registry card shape.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CardSchema {
    pub version: u32,
    pub fields: Vec<FieldSpec>,
}

impl Default for CardSchema {
    fn default() -> Self {
        let field = |name: &str, field_type: FieldType, required: bool| FieldSpec {
            name: name.to_string(),
            field_type,
            required,
            closed_vocabulary: None,
        };

        Self {
            version: CARD_SCHEMA_VERSION,
            fields: vec![
                field("name", FieldType::String, true),
                field("description", FieldType::String, true),
                field("version", FieldType::String, false),
                field("inputs", FieldType::InputList, true),
                field("outputs", FieldType::OutputList, true),
                field("tools", FieldType::StringList, true),
                FieldSpec {
                    name: "capability_tags".to_string(),
                    field_type: FieldType::StringList,
                    required: true,
                    closed_vocabulary: Some(
                        [
                            "search",
                            "retrieval",
                            "planning",
                            "summarization",
                            "conversation",
                            "code-generation",
                            "translation",
                            "data-analysis",
                            "automation",
                            "monitoring",
                            "streaming",
                            "memory",
                        ]
                        .map(String::from)
                        .to_vec(),
                    ),
                },
            ],
        }
    }
}

impl CardSchema {
    /// Load a schema definition from a JSON file
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, SchemaError> {
        let raw = std::fs::read_to_string(path)?;
        let schema: Self = serde_json::from_str(&raw)?;
        schema.check()?;
        Ok(schema)
    }

    /// Structural sanity checks on a loaded schema
    pub fn check(&self) -> Result<(), SchemaError> {
        if self.fields.is_empty() {
            return Err(SchemaError::Invalid("schema has no fields".to_string()));
        }
        for field in &self.fields {
            if field.name.trim().is_empty() {
                return Err(SchemaError::Invalid(
                    "schema field with empty name".to_string(),
                ));
            }
            if let Some(vocabulary) = &field.closed_vocabulary {
                if field.field_type != FieldType::StringList {
                    return Err(SchemaError::Invalid(format!(
                        "field `{}` has a vocabulary but is not a string list",
                        field.name
                    )));
                }
                if vocabulary.is_empty() {
                    return Err(SchemaError::Invalid(format!(
                        "field `{}` has an empty vocabulary",
                        field.name
                    )));
                }
            }
        }
        Ok(())
    }

    pub fn field(&self, name: &str) -> Option<&FieldSpec> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Compact, human-readable description embedded in synthesis prompts
    pub fn describe(&self) -> Value {
        let fields: Vec<Value> = self
            .fields
            .iter()
            .map(|f| {
                let mut entry = json!({
                    "field": f.name,
                    "type": f.field_type.as_str(),
                    "required": f.required,
                });
                if let Some(vocabulary) = &f.closed_vocabulary {
                    entry["allowed_values"] = json!(vocabulary);
                }
                entry
            })
            .collect();

        json!({
            "schema_version": self.version,
            "fields": fields,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_schema_passes_check() {
        let schema = CardSchema::default();
        assert!(schema.check().is_ok());
        assert_eq!(schema.version, CARD_SCHEMA_VERSION);
        assert!(schema.field("capability_tags").is_some());
    }

    #[test]
    fn test_describe_lists_vocabulary() {
        let schema = CardSchema::default();
        let description = schema.describe();
        let rendered = description.to_string();
        assert!(rendered.contains("capability_tags"));
        assert!(rendered.contains("allowed_values"));
    }

    #[test]
    fn test_vocabulary_on_non_list_rejected() {
        let schema = CardSchema {
            version: 1,
            fields: vec![FieldSpec {
                name: "name".to_string(),
                field_type: FieldType::String,
                required: true,
                closed_vocabulary: Some(vec!["a".to_string()]),
            }],
        };
        assert!(schema.check().is_err());
    }

    #[test]
    fn test_schema_json_round_trip() {
        let schema = CardSchema::default();
        let json = serde_json::to_string(&schema).unwrap();
        let back: CardSchema = serde_json::from_str(&json).unwrap();
        assert!(back.check().is_ok());
        assert_eq!(back.fields.len(), schema.fields.len());
    }
}
