use capcard_protocol::SchemaViolation;
use thiserror::Error;

/// Failure class reported by the completion service
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServiceErrorKind {
    Transport,
    Quota,
    Timeout,
}

impl ServiceErrorKind {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Transport => "transport",
            Self::Quota => "quota",
            Self::Timeout => "timeout",
        }
    }
}

/// Error from the generative completion service
#[derive(Debug, Clone)]
pub struct ServiceError {
    pub kind: ServiceErrorKind,
    pub message: String,
}

impl std::error::Error for ServiceError {}

impl std::fmt::Display for ServiceError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} error from completion service: {}",
            self.kind.as_str(),
            self.message
        )
    }
}

impl ServiceError {
    pub fn transport(message: impl Into<String>) -> Self {
        Self {
            kind: ServiceErrorKind::Transport,
            message: message.into(),
        }
    }

    pub fn quota(message: impl Into<String>) -> Self {
        Self {
            kind: ServiceErrorKind::Quota,
            message: message.into(),
        }
    }

    pub fn timeout(message: impl Into<String>) -> Self {
        Self {
            kind: ServiceErrorKind::Timeout,
            message: message.into(),
        }
    }
}

/// One failed validation attempt, kept for diagnostics
#[derive(Debug, Clone)]
pub struct AttemptFailure {
    /// 1-indexed draft attempt
    pub attempt: u32,
    pub violations: Vec<SchemaViolation>,
}

/// Terminal failure: the repair loop exhausted its retry bound.
///
/// Carries the full violation history; an invalid card is never returned.
#[derive(Debug)]
pub struct CardGenerationError {
    /// Repair attempts consumed (equals the configured bound)
    pub retries: u32,
    pub history: Vec<AttemptFailure>,
}

impl std::error::Error for CardGenerationError {}

impl std::fmt::Display for CardGenerationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "card generation failed after {} repair attempts; last draft had {} violation(s)",
            self.retries,
            self.last_violations().len()
        )
    }
}

impl CardGenerationError {
    /// Violations of the final rejected draft
    pub fn last_violations(&self) -> &[SchemaViolation] {
        self.history
            .last()
            .map(|failure| failure.violations.as_slice())
            .unwrap_or(&[])
    }
}

/// Errors from card synthesis
#[derive(Debug, Error)]
pub enum SynthError {
    /// The completion service kept failing within one drafting step
    #[error("completion service failed after {attempts} attempt(s): {source}")]
    Service {
        attempts: u32,
        #[source]
        source: ServiceError,
    },

    /// The repair loop exhausted its retry bound
    #[error(transparent)]
    CardGeneration(#[from] CardGenerationError),

    /// Synthesis configuration is unusable
    #[error("Invalid synthesis configuration: {0}")]
    InvalidConfig(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_service_error_display() {
        let err = ServiceError::quota("rate limited");
        assert_eq!(
            err.to_string(),
            "quota error from completion service: rate limited"
        );
    }

    #[test]
    fn test_card_generation_error_reports_last_attempt() {
        let err = CardGenerationError {
            retries: 2,
            history: vec![
                AttemptFailure {
                    attempt: 1,
                    violations: vec![],
                },
                AttemptFailure {
                    attempt: 2,
                    violations: vec![SchemaViolation {
                        field: "tools".to_string(),
                        message: "required field is missing".to_string(),
                    }],
                },
            ],
        };

        assert_eq!(err.last_violations().len(), 1);
        assert!(err.to_string().contains("2 repair attempts"));
    }
}
