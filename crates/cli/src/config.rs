use anyhow::{Context, Result};
use capcard_facts::ExtractorConfig;
use capcard_synth::SynthConfig;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Run configuration, loadable from a TOML file.
///
/// Everything here has a sensible default; command-line flags override
/// the service fields.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    /// Completion model identifier
    pub model: String,

    /// Base URL of the OpenAI-compatible completion API
    pub base_url: String,

    /// Completion request timeout in seconds
    pub timeout_secs: u64,

    /// Fact-extraction pattern tables
    pub extractor: ExtractorConfig,

    /// Synthesis and repair-loop bounds
    pub synthesis: SynthConfig,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            model: "o4-mini".to_string(),
            base_url: "https://api.openai.com/v1".to_string(),
            timeout_secs: 120,
            extractor: ExtractorConfig::default(),
            synthesis: SynthConfig::default(),
        }
    }
}

impl RunConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        let config: Self = toml::from_str(&raw)
            .with_context(|| format!("parsing config {}", path.display()))?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_defaults() {
        let config = RunConfig::default();
        assert_eq!(config.model, "o4-mini");
        assert_eq!(config.timeout_secs, 120);
        assert!(config.extractor.validate().is_ok());
        assert!(config.synthesis.validate().is_ok());
    }

    #[test]
    fn test_partial_toml_overrides() {
        let raw = r#"
model = "gpt-4o"

[synthesis]
max_repair_attempts = 5
"#;
        let config: RunConfig = toml::from_str(raw).unwrap();
        assert_eq!(config.model, "gpt-4o");
        assert_eq!(config.synthesis.max_repair_attempts, 5);
        // Untouched sections keep their defaults
        assert_eq!(config.base_url, "https://api.openai.com/v1");
        assert!(!config.extractor.tool_identifiers.is_empty());
    }
}
