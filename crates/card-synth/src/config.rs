use crate::{Result, SynthError};
use serde::{Deserialize, Serialize};

/// Configuration for card synthesis.
///
/// Passed in at construction so concurrent runs with different bounds
/// never interfere.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SynthConfig {
    /// Repair attempts after the initial draft. The loop produces at most
    /// `max_repair_attempts + 1` drafts before failing.
    pub max_repair_attempts: u32,

    /// Completion-service calls per drafting step (retries for
    /// transport/quota/timeout failures)
    pub max_service_attempts: u32,

    /// Prompt size budget in characters. Over budget, inferred findings
    /// are dropped before exact ones.
    pub prompt_budget_chars: usize,

    /// Output bound passed to the completion service
    pub max_output_tokens: u32,
}

impl Default for SynthConfig {
    fn default() -> Self {
        Self {
            max_repair_attempts: 2,
            max_service_attempts: 2,
            prompt_budget_chars: 24_000,
            max_output_tokens: 1_024,
        }
    }
}

impl SynthConfig {
    /// Validate configuration bounds
    pub fn validate(&self) -> Result<()> {
        if self.max_service_attempts == 0 {
            return Err(SynthError::InvalidConfig(
                "max_service_attempts must be >= 1".to_string(),
            ));
        }
        if self.prompt_budget_chars < 1_000 {
            return Err(SynthError::InvalidConfig(format!(
                "prompt_budget_chars ({}) is too small to hold the schema",
                self.prompt_budget_chars
            )));
        }
        if self.max_output_tokens == 0 {
            return Err(SynthError::InvalidConfig(
                "max_output_tokens must be > 0".to_string(),
            ));
        }
        Ok(())
    }
}
