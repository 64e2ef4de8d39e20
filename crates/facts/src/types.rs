use serde::{Deserialize, Serialize};

/// How a finding was derived.
///
/// `Exact` comes from explicit annotations or declarations; `Inferred`
/// comes from naming heuristics. Ordering matters: `Exact > Inferred`.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Confidence {
    Inferred,
    Exact,
}

impl Confidence {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Inferred => "inferred",
            Self::Exact => "exact",
        }
    }
}

/// Kind of discovered fact
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FindingKind {
    InputParam,
    OutputValue,
    ToolInvocation,
    CapabilityTag,
    SideEffect,
    /// Call target computed at runtime; surfaced so card consumers know
    /// static coverage is best-effort
    UnresolvedCallSite,
}

impl FindingKind {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::InputParam => "input_param",
            Self::OutputValue => "output_value",
            Self::ToolInvocation => "tool_invocation",
            Self::CapabilityTag => "capability_tag",
            Self::SideEffect => "side_effect",
            Self::UnresolvedCallSite => "unresolved_call_site",
        }
    }

    /// All kinds, in the order the fact base groups them
    pub const ALL: [FindingKind; 6] = [
        Self::InputParam,
        Self::OutputValue,
        Self::ToolInvocation,
        Self::CapabilityTag,
        Self::SideEffect,
        Self::UnresolvedCallSite,
    ];
}

/// One discovered fact about a definition
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Finding {
    pub kind: FindingKind,

    /// The fact's subject: parameter name, tool name, capability tag, ...
    pub name: String,

    /// Declared or inferred type, when one applies
    pub value_type: Option<String>,

    /// Free-text description for the prompt
    pub description: String,

    /// Where the fact came from: "path:qualified_name"
    pub source: String,

    pub confidence: Confidence,
}

impl Finding {
    /// Deduplication key: kind plus case-insensitive, whitespace-collapsed
    /// name
    pub fn key(&self) -> (FindingKind, String) {
        (self.kind, normalize_name(&self.name))
    }

    /// Marker finding for a call site whose target is computed at runtime
    pub fn unresolved(
        module_path: &str,
        definition: &str,
        expression: &str,
        line: usize,
    ) -> Self {
        Self {
            kind: FindingKind::UnresolvedCallSite,
            name: expression.to_string(),
            value_type: None,
            description: format!(
                "call target computed at runtime in `{definition}` (line {line})"
            ),
            source: format!("{module_path}:{definition}"),
            confidence: Confidence::Inferred,
        }
    }
}

/// Case-insensitive, whitespace-collapsed name normalization
pub(crate) fn normalize_name(name: &str) -> String {
    name.to_lowercase()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Ordered, deduplicated collection of findings.
///
/// Insertion order is discovery order; no two findings with the same
/// (kind, normalized name) key survive aggregation.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct FactBase {
    findings: Vec<Finding>,
}

impl FactBase {
    pub fn new(findings: Vec<Finding>) -> Self {
        Self { findings }
    }

    pub fn len(&self) -> usize {
        self.findings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.findings.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Finding> {
        self.findings.iter()
    }

    /// Findings of one kind, in discovery order
    pub fn by_kind(&self, kind: FindingKind) -> impl Iterator<Item = &Finding> {
        self.findings.iter().filter(move |f| f.kind == kind)
    }

    pub fn into_findings(self) -> Vec<Finding> {
        self.findings
    }
}
