use capcard_facts::{Confidence, FactBase, Finding, FindingKind};
use capcard_protocol::{CardSchema, SchemaViolation};

/// How much of an invalid draft is echoed back in a corrective prompt
const DRAFT_ECHO_MAX_CHARS: usize = 4_000;

/// Render the synthesis prompt.
///
/// Deterministic: the same fact base and schema always produce the same
/// text. Over the character budget, inferred findings are dropped from
/// the end before any exact finding; the omission is stated in the prompt
/// so the model knows coverage was reduced.
pub fn render_prompt(facts: &FactBase, schema: &CardSchema, budget_chars: usize) -> String {
    let (kept, omitted) = fit_to_budget(facts, schema, budget_chars, 0);
    prompt_from_parts(&kept, omitted, schema)
}

/// Render the corrective prompt for a rejected draft.
///
/// Embeds the fact base, the enumerated violations, and the invalid
/// draft. The model is told to re-emit a full card; the validator will
/// re-check everything regardless.
pub fn render_repair_prompt(
    facts: &FactBase,
    schema: &CardSchema,
    violations: &[SchemaViolation],
    draft: &str,
    budget_chars: usize,
) -> String {
    let mut tail = String::from("\nA previous draft failed schema validation.\n\nViolations:\n");
    for violation in violations {
        tail.push_str(&format!("- {violation}\n"));
    }
    tail.push_str("\nRejected draft:\n");
    tail.push_str(&truncate_chars(draft, DRAFT_ECHO_MAX_CHARS));
    tail.push_str(
        "\n\nProduce a corrected card: a single JSON object that fixes every \
         violation above while still reflecting only the listed facts.\n",
    );

    let (kept, omitted) = fit_to_budget(facts, schema, budget_chars, tail.chars().count());
    let mut out = prompt_from_parts(&kept, omitted, schema);
    out.push_str(&tail);
    out
}

/// Drop inferred findings (from the end) until the rendered prompt plus
/// `extra_chars` of fixed overhead fits the budget. Exact findings are
/// never dropped before inferred ones.
fn fit_to_budget<'a>(
    facts: &'a FactBase,
    schema: &CardSchema,
    budget_chars: usize,
    extra_chars: usize,
) -> (Vec<&'a Finding>, usize) {
    let mut kept: Vec<&Finding> = facts.iter().collect();
    let mut omitted = 0usize;

    loop {
        let rendered = prompt_from_parts(&kept, omitted, schema);
        if rendered.chars().count() + extra_chars <= budget_chars {
            return (kept, omitted);
        }

        let Some(last_inferred) = kept
            .iter()
            .rposition(|f| f.confidence == Confidence::Inferred)
        else {
            // Only exact facts remain; the bound on the draft echo and the
            // schema keep the prompt near the budget
            log::warn!(
                "Prompt exceeds budget ({budget_chars} chars) with only exact facts left"
            );
            return (kept, omitted);
        };

        kept.remove(last_inferred);
        omitted += 1;
    }
}

fn prompt_from_parts(kept: &[&Finding], omitted: usize, schema: &CardSchema) -> String {
    let mut out = String::new();

    out.push_str(
        "You are an expert software analyst. The facts below were extracted \
         statically from an autonomous agent's source code. Produce the agent's \
         capability card for an interoperability registry.\n\n",
    );
    out.push_str("Respond with a single JSON object conforming to this schema:\n");
    out.push_str(&serde_json::to_string_pretty(&schema.describe()).unwrap_or_default());
    out.push_str("\n\nRules:\n");
    out.push_str("- Output JSON only, with no surrounding prose.\n");
    out.push_str("- Entries with a closed vocabulary must use only allowed values.\n");
    out.push_str("- Do not invent tools, inputs, or outputs absent from the facts.\n");
    out.push_str(
        "- Write the description in plain business language, not technical detail.\n",
    );

    out.push_str(
        "\nFacts (confidence `exact` = declared in code, `inferred` = heuristic):\n",
    );
    for kind in FindingKind::ALL {
        let of_kind: Vec<&&Finding> = kept.iter().filter(|f| f.kind == kind).collect();
        if of_kind.is_empty() {
            continue;
        }
        out.push_str(&format!("\n## {}\n", kind.as_str()));
        for finding in of_kind {
            out.push_str(&format!(
                "- [{}] {} — {} (from {})\n",
                finding.confidence.as_str(),
                finding.name,
                finding.description,
                finding.source,
            ));
        }
    }

    if omitted > 0 {
        out.push_str(&format!(
            "\n({omitted} low-confidence fact(s) omitted to fit the size budget.)\n"
        ));
    }

    out
}

fn truncate_chars(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        text.to_string()
    } else {
        let kept: String = text.chars().take(max_chars).collect();
        format!("{kept}\n… (draft truncated)")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use capcard_facts::aggregate;
    use pretty_assertions::assert_eq;

    fn finding(kind: FindingKind, name: &str, confidence: Confidence) -> Finding {
        Finding {
            kind,
            name: name.to_string(),
            value_type: None,
            description: format!("fact about {name}"),
            source: "agent.py:run".to_string(),
            confidence,
        }
    }

    fn sample_facts() -> FactBase {
        aggregate(vec![
            finding(FindingKind::InputParam, "query", Confidence::Exact),
            finding(FindingKind::ToolInvocation, "call_search_tool", Confidence::Inferred),
            finding(FindingKind::CapabilityTag, "search", Confidence::Exact),
        ])
    }

    #[test]
    fn test_prompt_is_deterministic() {
        let facts = sample_facts();
        let schema = CardSchema::default();
        let a = render_prompt(&facts, &schema, 24_000);
        let b = render_prompt(&facts, &schema, 24_000);
        assert_eq!(a, b);
    }

    #[test]
    fn test_prompt_groups_by_kind() {
        let prompt = render_prompt(&sample_facts(), &CardSchema::default(), 24_000);
        assert!(prompt.contains("## input_param"));
        assert!(prompt.contains("## tool_invocation"));
        assert!(prompt.contains("[exact] query"));
        assert!(prompt.contains("[inferred] call_search_tool"));
    }

    #[test]
    fn test_budget_drops_inferred_first() {
        let mut findings = vec![finding(FindingKind::InputParam, "query", Confidence::Exact)];
        for idx in 0..200 {
            findings.push(finding(
                FindingKind::ToolInvocation,
                &format!("inferred_tool_number_{idx}"),
                Confidence::Inferred,
            ));
        }
        let facts = aggregate(findings);
        let schema = CardSchema::default();

        let prompt = render_prompt(&facts, &schema, 3_000);
        assert!(prompt.chars().count() <= 3_000);
        // The exact fact always survives
        assert!(prompt.contains("[exact] query"));
        assert!(prompt.contains("omitted to fit the size budget"));
    }

    #[test]
    fn test_repair_prompt_embeds_violations_and_draft() {
        let violations = vec![SchemaViolation {
            field: "tools".to_string(),
            message: "required field is missing".to_string(),
        }];
        let prompt = render_repair_prompt(
            &sample_facts(),
            &CardSchema::default(),
            &violations,
            "{\"name\": \"x\"}",
            24_000,
        );

        assert!(prompt.contains("tools: required field is missing"));
        assert!(prompt.contains("{\"name\": \"x\"}"));
        assert!(prompt.contains("corrected card"));
        // Still carries the original facts
        assert!(prompt.contains("call_search_tool"));
    }
}
