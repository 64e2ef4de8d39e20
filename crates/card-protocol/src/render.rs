use crate::CapabilityCard;

/// Pretty-printed JSON for a validated card
pub fn to_json_pretty(card: &CapabilityCard) -> serde_json::Result<String> {
    serde_json::to_string_pretty(card)
}

/// Markdown rendering for a validated card
pub fn to_markdown(card: &CapabilityCard) -> String {
    let mut out = String::new();

    out.push_str(&format!("# {}\n\n", card.name));
    if let Some(version) = &card.version {
        out.push_str(&format!("Version: {version}\n\n"));
    }
    out.push_str(&format!("{}\n\n", card.description));

    out.push_str("## Inputs\n\n");
    if card.inputs.is_empty() {
        out.push_str("_None declared._\n\n");
    } else {
        for input in &card.inputs {
            let mut line = format!("- `{}`", input.name);
            if let Some(value_type) = &input.value_type {
                line.push_str(&format!(" (`{value_type}`)"));
            }
            if let Some(description) = &input.description {
                line.push_str(&format!(" — {description}"));
            }
            out.push_str(&line);
            out.push('\n');
        }
        out.push('\n');
    }

    out.push_str("## Outputs\n\n");
    if card.outputs.is_empty() {
        out.push_str("_None declared._\n\n");
    } else {
        for output in &card.outputs {
            let label = output
                .name
                .clone()
                .or_else(|| output.value_type.clone())
                .unwrap_or_else(|| "value".to_string());
            let mut line = format!("- `{label}`");
            if output.name.is_some() {
                if let Some(value_type) = &output.value_type {
                    line.push_str(&format!(" (`{value_type}`)"));
                }
            }
            if let Some(description) = &output.description {
                line.push_str(&format!(" — {description}"));
            }
            out.push_str(&line);
            out.push('\n');
        }
        out.push('\n');
    }

    out.push_str("## Tools\n\n");
    if card.tools.is_empty() {
        out.push_str("_None detected._\n\n");
    } else {
        for tool in &card.tools {
            out.push_str(&format!("- `{tool}`\n"));
        }
        out.push('\n');
    }

    out.push_str("## Capabilities\n\n");
    if card.capability_tags.is_empty() {
        out.push_str("_None declared._\n");
    } else {
        for tag in &card.capability_tags {
            out.push_str(&format!("- {tag}\n"));
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{CardInput, CardOutput};

    fn sample_card() -> CapabilityCard {
        CapabilityCard {
            name: "travel-assistant".to_string(),
            description: "Plans trips using a search tool".to_string(),
            version: Some("0.0.1".to_string()),
            inputs: vec![CardInput {
                name: "query".to_string(),
                value_type: Some("str".to_string()),
                description: Some("the traveler's request".to_string()),
            }],
            outputs: vec![CardOutput {
                name: None,
                value_type: Some("str".to_string()),
                description: None,
            }],
            tools: vec!["call_search_tool".to_string()],
            capability_tags: vec!["search".to_string(), "planning".to_string()],
        }
    }

    #[test]
    fn test_markdown_sections() {
        let markdown = to_markdown(&sample_card());
        assert!(markdown.starts_with("# travel-assistant\n"));
        assert!(markdown.contains("Version: 0.0.1"));
        assert!(markdown.contains("- `query` (`str`) — the traveler's request"));
        assert!(markdown.contains("## Tools"));
        assert!(markdown.contains("- `call_search_tool`"));
        assert!(markdown.contains("- planning"));
    }

    #[test]
    fn test_json_pretty_is_valid() {
        let json = to_json_pretty(&sample_card()).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["name"], "travel-assistant");
    }
}
