use anyhow::{Context, Result};
use capcard_protocol::{to_json_pretty, to_markdown, CapabilityCard};
use clap::ValueEnum;
use std::path::{Path, PathBuf};

/// Serialization target for the validated card
#[derive(Debug, Copy, Clone, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Json,
    Markdown,
    Both,
}

/// Write the validated card into `output_dir`, named after the card.
/// Returns the paths written.
pub fn write_card(
    card: &CapabilityCard,
    output_dir: &Path,
    format: OutputFormat,
) -> Result<Vec<PathBuf>> {
    std::fs::create_dir_all(output_dir)
        .with_context(|| format!("creating output directory {}", output_dir.display()))?;

    let slug = slugify(&card.name);
    let mut written = Vec::new();

    if matches!(format, OutputFormat::Json | OutputFormat::Both) {
        let path = output_dir.join(format!("{slug}_card.json"));
        let json = to_json_pretty(card).context("serializing card to JSON")?;
        std::fs::write(&path, json)
            .with_context(|| format!("writing {}", path.display()))?;
        log::info!("Card saved to {}", path.display());
        written.push(path);
    }

    if matches!(format, OutputFormat::Markdown | OutputFormat::Both) {
        let path = output_dir.join(format!("{slug}_card.md"));
        std::fs::write(&path, to_markdown(card))
            .with_context(|| format!("writing {}", path.display()))?;
        log::info!("Card saved to {}", path.display());
        written.push(path);
    }

    Ok(written)
}

/// Filesystem-safe name: lowercase alphanumerics joined by '-'
pub fn slugify(name: &str) -> String {
    let mut slug = String::new();
    let mut last_dash = true;
    for c in name.chars() {
        if c.is_ascii_alphanumeric() {
            slug.push(c.to_ascii_lowercase());
            last_dash = false;
        } else if !last_dash {
            slug.push('-');
            last_dash = true;
        }
    }
    let trimmed = slug.trim_end_matches('-');
    if trimmed.is_empty() {
        "card".to_string()
    } else {
        trimmed.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use capcard_protocol::CardInput;
    use pretty_assertions::assert_eq;

    fn sample_card() -> CapabilityCard {
        CapabilityCard {
            name: "Travel Assistant".to_string(),
            description: "Plans trips".to_string(),
            version: None,
            inputs: vec![CardInput {
                name: "query".to_string(),
                value_type: Some("str".to_string()),
                description: None,
            }],
            outputs: vec![],
            tools: vec![],
            capability_tags: vec![],
        }
    }

    #[test]
    fn test_slugify() {
        assert_eq!(slugify("Travel Assistant"), "travel-assistant");
        assert_eq!(slugify("kirikiri.near/travel-assistant/0.0.1"), "kirikiri-near-travel-assistant-0-0-1");
        assert_eq!(slugify("***"), "card");
    }

    #[test]
    fn test_write_both_formats() {
        let dir = tempfile::tempdir().unwrap();
        let written = write_card(&sample_card(), dir.path(), OutputFormat::Both).unwrap();

        assert_eq!(written.len(), 2);
        let json = std::fs::read_to_string(&written[0]).unwrap();
        assert!(json.contains("\"query\""));
        let markdown = std::fs::read_to_string(&written[1]).unwrap();
        assert!(markdown.starts_with("# Travel Assistant"));
    }
}
