use crate::types::{FactBase, Finding, FindingKind};
use std::collections::HashMap;

/// Merge per-definition finding lists (in traversal order) into the
/// deduplicated fact base.
///
/// Per (kind, normalized name) group the finding with the highest
/// confidence survives; on equal confidence the earliest-discovered one
/// is kept. The rule depends only on confidence and discovery order, so
/// it stays deterministic if extraction ever runs in parallel.
pub fn aggregate<I>(findings: I) -> FactBase
where
    I: IntoIterator<Item = Finding>,
{
    let mut ordered: Vec<Finding> = Vec::new();
    let mut index: HashMap<(FindingKind, String), usize> = HashMap::new();

    for finding in findings {
        let key = finding.key();
        match index.get(&key) {
            Some(&slot) => {
                if finding.confidence > ordered[slot].confidence {
                    ordered[slot] = finding;
                }
            }
            None => {
                index.insert(key, ordered.len());
                ordered.push(finding);
            }
        }
    }

    log::debug!("Aggregated fact base: {} findings", ordered.len());
    FactBase::new(ordered)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Confidence;
    use pretty_assertions::assert_eq;

    fn finding(kind: FindingKind, name: &str, confidence: Confidence) -> Finding {
        Finding {
            kind,
            name: name.to_string(),
            value_type: None,
            description: format!("about {name}"),
            source: "agent.py:run".to_string(),
            confidence,
        }
    }

    #[test]
    fn test_case_and_whitespace_dedup() {
        let base = aggregate(vec![
            finding(FindingKind::ToolInvocation, "FetchData", Confidence::Inferred),
            finding(FindingKind::ToolInvocation, "fetchdata ", Confidence::Inferred),
        ]);

        assert_eq!(base.len(), 1);
        assert_eq!(base.iter().next().unwrap().name, "FetchData");
    }

    #[test]
    fn test_exact_beats_earlier_inferred() {
        let base = aggregate(vec![
            finding(FindingKind::InputParam, "x", Confidence::Inferred),
            finding(FindingKind::InputParam, "x", Confidence::Exact),
        ]);

        assert_eq!(base.len(), 1);
        assert_eq!(base.iter().next().unwrap().confidence, Confidence::Exact);
    }

    #[test]
    fn test_earlier_exact_survives_later_inferred() {
        let base = aggregate(vec![
            finding(FindingKind::InputParam, "x", Confidence::Exact),
            finding(FindingKind::InputParam, "x", Confidence::Inferred),
        ]);

        assert_eq!(base.len(), 1);
        assert_eq!(base.iter().next().unwrap().confidence, Confidence::Exact);
    }

    #[test]
    fn test_same_name_different_kind_not_merged() {
        let base = aggregate(vec![
            finding(FindingKind::InputParam, "query", Confidence::Exact),
            finding(FindingKind::ToolInvocation, "query", Confidence::Inferred),
        ]);

        assert_eq!(base.len(), 2);
    }

    #[test]
    fn test_idempotent() {
        let once = aggregate(vec![
            finding(FindingKind::InputParam, "query", Confidence::Exact),
            finding(FindingKind::ToolInvocation, "search", Confidence::Inferred),
            finding(FindingKind::InputParam, "Query", Confidence::Inferred),
        ]);

        let twice = aggregate(once.iter().cloned().chain(once.iter().cloned()));
        assert_eq!(once, twice);
    }

    #[test]
    fn test_discovery_order_preserved() {
        let base = aggregate(vec![
            finding(FindingKind::ToolInvocation, "b_tool", Confidence::Inferred),
            finding(FindingKind::ToolInvocation, "a_tool", Confidence::Inferred),
        ]);

        let names: Vec<_> = base.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["b_tool", "a_tool"]);
    }
}
