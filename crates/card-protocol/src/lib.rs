//! # Capcard Protocol
//!
//! The externally-fixed capability-card contract: the card record, the
//! versioned schema it must conform to, draft validation, and rendering of
//! an already-valid card.
//!
//! The schema is configuration, not something derived from analyzed code:
//! a fixed field list with required/optional markers, primitive types, and
//! a closed capability-tag vocabulary.

use serde::{Deserialize, Serialize};

mod render;
mod schema;
mod validator;

pub use render::{to_json_pretty, to_markdown};
pub use schema::{CardSchema, FieldSpec, FieldType, SchemaError};
pub use validator::{strip_code_fences, validate_draft, SchemaViolation};

pub const CARD_SCHEMA_VERSION: u32 = 1;

/// One declared input of the agent
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct CardInput {
    pub name: String,

    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub value_type: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// One declared output of the agent
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct CardOutput {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub value_type: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// The validated capability card.
///
/// Created only by [`validate_draft`]; immutable once returned. This is
/// the pipeline's only persisted output.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct CapabilityCard {
    pub name: String,
    pub description: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,

    pub inputs: Vec<CardInput>,
    pub outputs: Vec<CardOutput>,
    pub tools: Vec<String>,
    pub capability_tags: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_card_round_trips_without_nulls() {
        let card = CapabilityCard {
            name: "travel-assistant".to_string(),
            description: "Plans trips".to_string(),
            version: None,
            inputs: vec![CardInput {
                name: "query".to_string(),
                value_type: Some("str".to_string()),
                description: None,
            }],
            outputs: vec![],
            tools: vec!["call_search_tool".to_string()],
            capability_tags: vec!["planning".to_string()],
        };

        let json = serde_json::to_string(&card).unwrap();
        assert!(!json.contains("null"));
        let back: CapabilityCard = serde_json::from_str(&json).unwrap();
        assert_eq!(back, card);
    }
}
