use crate::config::ExtractorConfig;
use crate::types::{Confidence, Finding, FindingKind};
use crate::Result;
use capcard_code_model::{DefKind, Definition};
use regex::Regex;
use std::collections::HashSet;

/// Per-definition fact extraction driven by configured pattern tables
pub struct Extractor {
    tool_identifiers: HashSet<String>,
    side_effect_identifiers: HashSet<String>,
    line_patterns: Vec<Regex>,
    decorator_patterns: Vec<Regex>,
}

impl Extractor {
    pub fn new(config: &ExtractorConfig) -> Result<Self> {
        config.validate()?;

        let compile = |patterns: &[String]| -> Vec<Regex> {
            // validate() already compiled these; failures cannot occur here
            patterns.iter().filter_map(|p| Regex::new(p).ok()).collect()
        };

        Ok(Self {
            tool_identifiers: to_lower_set(&config.tool_identifiers),
            side_effect_identifiers: to_lower_set(&config.side_effect_identifiers),
            line_patterns: compile(&config.capability_line_patterns),
            decorator_patterns: compile(&config.capability_decorator_patterns),
        })
    }

    /// Extract zero or more findings from one definition.
    ///
    /// Never fails: unexpected shapes degrade to zero findings for the
    /// definition and a logged warning.
    pub fn extract(&self, module_path: &str, def: &Definition) -> Vec<Finding> {
        if def.name.is_empty() || def.name == "<anonymous>" {
            log::warn!(
                "Skipping extraction for unnamed definition in {module_path} (line {})",
                def.start_line
            );
            return vec![];
        }

        let source = format!("{module_path}:{}", def.qualified_name);
        let mut findings = Vec::new();

        self.extract_inputs(def, &source, &mut findings);
        self.extract_output(def, &source, &mut findings);
        self.extract_calls(def, &source, &mut findings);
        self.extract_capabilities(def, &source, &mut findings);

        findings
    }

    fn extract_inputs(&self, def: &Definition, source: &str, findings: &mut Vec<Finding>) {
        if def.kind == DefKind::Class {
            return;
        }

        for param in &def.params {
            if param.name == "self" || param.name == "cls" || param.name.starts_with('*') {
                continue;
            }

            let (confidence, description) = match &param.annotation {
                Some(annotation) => (
                    Confidence::Exact,
                    format!(
                        "parameter `{}: {annotation}` of `{}`",
                        param.name, def.qualified_name
                    ),
                ),
                None => (
                    Confidence::Inferred,
                    format!("parameter `{}` of `{}`", param.name, def.qualified_name),
                ),
            };

            findings.push(Finding {
                kind: FindingKind::InputParam,
                name: param.name.clone(),
                value_type: param.annotation.clone(),
                description,
                source: source.to_string(),
                confidence,
            });
        }
    }

    fn extract_output(&self, def: &Definition, source: &str, findings: &mut Vec<Finding>) {
        if def.kind == DefKind::Class {
            return;
        }

        let finding = match (&def.return_annotation, def.returns_value) {
            (Some(annotation), _) => Finding {
                kind: FindingKind::OutputValue,
                name: def.qualified_name.clone(),
                value_type: Some(annotation.clone()),
                description: format!(
                    "`{}` returns `{annotation}` (declared)",
                    def.qualified_name
                ),
                source: source.to_string(),
                confidence: Confidence::Exact,
            },
            (None, true) => Finding {
                kind: FindingKind::OutputValue,
                name: def.qualified_name.clone(),
                value_type: None,
                description: format!("`{}` returns a value (unannotated)", def.qualified_name),
                source: source.to_string(),
                confidence: Confidence::Inferred,
            },
            (None, false) => return,
        };

        findings.push(finding);
    }

    fn extract_calls(&self, def: &Definition, source: &str, findings: &mut Vec<Finding>) {
        for call in &def.calls {
            let Some(dotted) = call.callee.dotted() else {
                // Dynamic targets are surfaced by the reachability walker
                continue;
            };

            let tokens = name_tokens(dotted);

            if tokens.iter().any(|t| self.tool_identifiers.contains(t)) {
                findings.push(Finding {
                    kind: FindingKind::ToolInvocation,
                    name: dotted.to_string(),
                    value_type: None,
                    description: format!(
                        "`{}` calls tool `{dotted}` (line {})",
                        def.qualified_name, call.line
                    ),
                    source: source.to_string(),
                    confidence: Confidence::Inferred,
                });
            }

            if tokens
                .iter()
                .any(|t| self.side_effect_identifiers.contains(t))
            {
                findings.push(Finding {
                    kind: FindingKind::SideEffect,
                    name: dotted.to_string(),
                    value_type: None,
                    description: format!(
                        "`{}` performs a side-effecting call `{dotted}` (line {})",
                        def.qualified_name, call.line
                    ),
                    source: source.to_string(),
                    confidence: Confidence::Inferred,
                });
            }
        }
    }

    fn extract_capabilities(&self, def: &Definition, source: &str, findings: &mut Vec<Finding>) {
        let mut tags: Vec<String> = Vec::new();

        let lines = def
            .docstring
            .iter()
            .flat_map(|d| d.lines())
            .chain(def.leading_comments.iter().map(String::as_str));

        for line in lines {
            for pattern in &self.line_patterns {
                if let Some(captures) = pattern.captures(line) {
                    if let Some(list) = captures.get(1) {
                        tags.extend(
                            list.as_str()
                                .split(',')
                                .map(|t| t.trim().to_string())
                                .filter(|t| !t.is_empty()),
                        );
                    }
                }
            }
        }

        for decorator in &def.decorators {
            for pattern in &self.decorator_patterns {
                if let Some(captures) = pattern.captures(decorator) {
                    if let Some(tag) = captures.get(1) {
                        tags.push(tag.as_str().trim().to_string());
                    }
                }
            }
        }

        for tag in tags {
            findings.push(Finding {
                kind: FindingKind::CapabilityTag,
                name: tag.clone(),
                value_type: None,
                description: format!("`{}` declares capability `{tag}`", def.qualified_name),
                source: source.to_string(),
                confidence: Confidence::Exact,
            });
        }
    }
}

fn to_lower_set(identifiers: &[String]) -> HashSet<String> {
    identifiers.iter().map(|s| s.to_lowercase()).collect()
}

/// Lowercased `.`/`_` tokens of a callee name:
/// "call_search_tool" → ["call", "search", "tool"]
fn name_tokens(name: &str) -> Vec<String> {
    name.split(['.', '_'])
        .filter(|t| !t.is_empty())
        .map(str::to_lowercase)
        .collect()
}
