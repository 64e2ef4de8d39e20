use crate::{FactsError, Result};
use regex::Regex;
use serde::{Deserialize, Serialize};

/// Configuration for fact extraction.
///
/// Passed into the extractor at construction so concurrent runs with
/// different pattern tables never interfere.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractorConfig {
    /// Identifiers that mark a call as a tool/integration invocation.
    /// Matched against the lowercased `.`/`_` tokens of the callee name.
    pub tool_identifiers: Vec<String>,

    /// Identifiers that mark a call as side-effecting (file write,
    /// network send)
    pub side_effect_identifiers: Vec<String>,

    /// Patterns matched line-by-line against docstrings and leading
    /// comments; capture group 1 is a comma-separated tag list
    pub capability_line_patterns: Vec<String>,

    /// Patterns matched against decorator expressions; capture group 1
    /// is a single tag
    pub capability_decorator_patterns: Vec<String>,
}

impl Default for ExtractorConfig {
    fn default() -> Self {
        Self {
            tool_identifiers: [
                "search", "fetch", "http", "requests", "httpx", "urllib", "openai",
                "anthropic", "llm", "completion", "browser", "scrape", "crawl", "sql",
                "database", "api", "client", "tool", "subprocess",
            ]
            .map(String::from)
            .to_vec(),
            side_effect_identifiers: [
                "open", "write", "writelines", "save", "dump", "post", "put", "delete",
                "send", "sendall", "remove", "unlink", "rmdir", "mkdir", "rmtree",
                "upload", "publish",
            ]
            .map(String::from)
            .to_vec(),
            capability_line_patterns: vec![
                r"(?i)^\s*capabilit(?:y|ies)\s*:\s*(.+)$".to_string(),
            ],
            capability_decorator_patterns: vec![
                r#"(?i)^capability\s*\(\s*["']([A-Za-z0-9_\- ]+)["']"#.to_string(),
            ],
        }
    }
}

impl ExtractorConfig {
    /// Validate the configuration: identifier lists must be non-empty
    /// strings and every pattern must compile
    pub fn validate(&self) -> Result<()> {
        for ident in self
            .tool_identifiers
            .iter()
            .chain(&self.side_effect_identifiers)
        {
            if ident.trim().is_empty() {
                return Err(FactsError::InvalidConfig(
                    "identifier lists must not contain empty entries".to_string(),
                ));
            }
        }

        for pattern in self
            .capability_line_patterns
            .iter()
            .chain(&self.capability_decorator_patterns)
        {
            Regex::new(pattern).map_err(|e| FactsError::InvalidPattern {
                pattern: pattern.clone(),
                message: e.to_string(),
            })?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_valid() {
        assert!(ExtractorConfig::default().validate().is_ok());
    }

    #[test]
    fn test_bad_pattern_rejected() {
        let config = ExtractorConfig {
            capability_line_patterns: vec!["([unclosed".to_string()],
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(FactsError::InvalidPattern { .. })
        ));
    }

    #[test]
    fn test_empty_identifier_rejected() {
        let config = ExtractorConfig {
            tool_identifiers: vec!["  ".to_string()],
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }
}
