use crate::config::SynthConfig;
use crate::error::{AttemptFailure, CardGenerationError, SynthError};
use crate::prompt::{render_prompt, render_repair_prompt};
use crate::service::{CompletionRequest, CompletionService};
use crate::Result;
use capcard_facts::FactBase;
use capcard_protocol::{validate_draft, CapabilityCard, CardSchema};

/// Drives prompt rendering, the completion service, and the bounded
/// draft → validate → repair cycle.
pub struct Synthesizer<S: CompletionService> {
    service: S,
    schema: CardSchema,
    config: SynthConfig,
}

impl<S: CompletionService> Synthesizer<S> {
    pub fn new(service: S, schema: CardSchema, config: SynthConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            service,
            schema,
            config,
        })
    }

    /// Synthesize a schema-valid card from the fact base.
    ///
    /// Each drafting step calls the completion service up to
    /// `max_service_attempts` times; each rejected draft consumes one of
    /// `max_repair_attempts`. Every draft is validated in full — the
    /// service is non-deterministic, so prior violations are never assumed
    /// fixed. On exhaustion the full violation history is surfaced; an
    /// invalid card is never returned.
    pub fn synthesize(&self, facts: &FactBase) -> Result<CapabilityCard> {
        let budget = self.config.prompt_budget_chars;
        let mut retries = 0u32;
        let mut history: Vec<AttemptFailure> = Vec::new();
        let mut prompt = render_prompt(facts, &self.schema, budget);

        loop {
            // Drafting
            let draft = self.draft(&prompt)?;

            // Validating
            let violations = match validate_draft(&draft, &self.schema) {
                Ok(card) => {
                    log::info!("Card `{}` validated after {retries} repair(s)", card.name);
                    return Ok(card);
                }
                Err(violations) => violations,
            };

            log::warn!(
                "Draft {} failed validation with {} violation(s)",
                history.len() + 1,
                violations.len()
            );
            history.push(AttemptFailure {
                attempt: history.len() as u32 + 1,
                violations: violations.clone(),
            });

            // Repairing or Failed
            if retries >= self.config.max_repair_attempts {
                return Err(SynthError::CardGeneration(CardGenerationError {
                    retries,
                    history,
                }));
            }
            retries += 1;
            prompt = render_repair_prompt(facts, &self.schema, &violations, &draft, budget);
        }
    }

    /// One drafting step: call the service, retrying classified failures
    /// up to the configured bound
    fn draft(&self, prompt: &str) -> Result<String> {
        let request = CompletionRequest {
            prompt: prompt.to_string(),
            max_output_tokens: self.config.max_output_tokens,
        };

        let mut attempts = 0u32;
        loop {
            attempts += 1;
            match self.service.generate(&request) {
                Ok(text) => return Ok(text),
                Err(e) if attempts < self.config.max_service_attempts => {
                    log::warn!("Completion attempt {attempts} failed, retrying: {e}");
                }
                Err(e) => {
                    return Err(SynthError::Service {
                        attempts,
                        source: e,
                    })
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ServiceError;
    use capcard_facts::{aggregate, Confidence, Finding, FindingKind};
    use std::cell::RefCell;
    use std::collections::VecDeque;

    /// Scripted fake: pops one canned response per generate() call,
    /// repeating the last one when the script runs dry
    struct ScriptedService {
        script: RefCell<VecDeque<std::result::Result<String, ServiceError>>>,
        last: std::result::Result<String, ServiceError>,
        calls: RefCell<u32>,
    }

    impl ScriptedService {
        fn new(script: Vec<std::result::Result<String, ServiceError>>) -> Self {
            let last = script
                .last()
                .cloned()
                .unwrap_or_else(|| Err(ServiceError::transport("empty script")));
            Self {
                script: RefCell::new(script.into()),
                last,
                calls: RefCell::new(0),
            }
        }

        fn calls(&self) -> u32 {
            *self.calls.borrow()
        }
    }

    impl CompletionService for &ScriptedService {
        fn generate(
            &self,
            _request: &CompletionRequest,
        ) -> std::result::Result<String, ServiceError> {
            *self.calls.borrow_mut() += 1;
            self.script
                .borrow_mut()
                .pop_front()
                .unwrap_or_else(|| self.last.clone())
        }
    }

    fn sample_facts() -> FactBase {
        aggregate(vec![Finding {
            kind: FindingKind::InputParam,
            name: "query".to_string(),
            value_type: Some("str".to_string()),
            description: "parameter `query: str` of `run`".to_string(),
            source: "agent.py:run".to_string(),
            confidence: Confidence::Exact,
        }])
    }

    fn valid_draft() -> String {
        serde_json::json!({
            "name": "agent",
            "description": "Answers queries",
            "inputs": [{"name": "query", "type": "str"}],
            "outputs": [{"type": "str"}],
            "tools": [],
            "capability_tags": [],
        })
        .to_string()
    }

    fn invalid_draft() -> String {
        // Missing the required `tools` field
        serde_json::json!({
            "name": "agent",
            "description": "Answers queries",
            "inputs": [],
            "outputs": [],
            "capability_tags": [],
        })
        .to_string()
    }

    #[test]
    fn test_first_draft_valid() {
        let service = ScriptedService::new(vec![Ok(valid_draft())]);
        let synthesizer =
            Synthesizer::new(&service, CardSchema::default(), SynthConfig::default()).unwrap();

        let card = synthesizer.synthesize(&sample_facts()).unwrap();
        assert_eq!(card.name, "agent");
        assert_eq!(service.calls(), 1);
    }

    #[test]
    fn test_repair_recovers() {
        let service = ScriptedService::new(vec![Ok(invalid_draft()), Ok(valid_draft())]);
        let synthesizer =
            Synthesizer::new(&service, CardSchema::default(), SynthConfig::default()).unwrap();

        let card = synthesizer.synthesize(&sample_facts()).unwrap();
        assert_eq!(card.name, "agent");
        assert_eq!(service.calls(), 2);
    }

    #[test]
    fn test_repair_loop_terminates_at_bound() {
        let service = ScriptedService::new(vec![Ok(invalid_draft())]);
        let config = SynthConfig {
            max_repair_attempts: 2,
            ..Default::default()
        };
        let synthesizer =
            Synthesizer::new(&service, CardSchema::default(), config).unwrap();

        let err = synthesizer.synthesize(&sample_facts()).unwrap_err();
        match err {
            SynthError::CardGeneration(e) => {
                assert_eq!(e.retries, 2);
                // Initial draft + two repairs, each validated in full
                assert_eq!(e.history.len(), 3);
                assert_eq!(e.last_violations()[0].field, "tools");
            }
            other => panic!("expected CardGeneration, got {other}"),
        }
        assert_eq!(service.calls(), 3);
    }

    #[test]
    fn test_service_retry_then_success() {
        let service = ScriptedService::new(vec![
            Err(ServiceError::timeout("slow")),
            Ok(valid_draft()),
        ]);
        let synthesizer =
            Synthesizer::new(&service, CardSchema::default(), SynthConfig::default()).unwrap();

        assert!(synthesizer.synthesize(&sample_facts()).is_ok());
        assert_eq!(service.calls(), 2);
    }

    #[test]
    fn test_service_failure_exhausts() {
        let service = ScriptedService::new(vec![Err(ServiceError::quota("rate limited"))]);
        let config = SynthConfig {
            max_service_attempts: 3,
            ..Default::default()
        };
        let synthesizer =
            Synthesizer::new(&service, CardSchema::default(), config).unwrap();

        let err = synthesizer.synthesize(&sample_facts()).unwrap_err();
        match err {
            SynthError::Service { attempts, source } => {
                assert_eq!(attempts, 3);
                assert_eq!(source.kind, crate::ServiceErrorKind::Quota);
            }
            other => panic!("expected Service error, got {other}"),
        }
        assert_eq!(service.calls(), 3);
    }

    #[test]
    fn test_fenced_draft_accepted() {
        let fenced = format!("```json\n{}\n```", valid_draft());
        let service = ScriptedService::new(vec![Ok(fenced)]);
        let synthesizer =
            Synthesizer::new(&service, CardSchema::default(), SynthConfig::default()).unwrap();

        assert!(synthesizer.synthesize(&sample_facts()).is_ok());
    }
}
