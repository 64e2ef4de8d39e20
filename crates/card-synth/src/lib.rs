//! # Capcard Synth
//!
//! Renders the fact base into a bounded prompt, invokes the generative
//! completion service, and repairs invalid drafts against the card schema.
//!
//! ## Architecture
//!
//! ```text
//! FactBase + CardSchema
//!     │
//!     ├──> Prompt Renderer
//!     │      ├─ Deterministic (same fact base ⇒ same prompt)
//!     │      └─ Size budget: inferred facts dropped before exact ones
//!     │
//!     ├──> Completion Service (trait)
//!     │      ├─ HTTP client (OpenAI-compatible chat completions)
//!     │      └─ ServiceError{transport|quota|timeout}
//!     │
//!     └──> Repair Loop
//!            Drafting → Validating → {Done, Repairing, Failed}
//!            ├─ Corrective prompt embeds facts + violations + draft
//!            ├─ Bounded retries, full re-validation every attempt
//!            └─ Failed: CardGenerationError with violation history
//! ```

mod config;
mod error;
mod prompt;
mod service;
mod synthesizer;

pub use config::SynthConfig;
pub use error::{AttemptFailure, CardGenerationError, ServiceError, ServiceErrorKind, SynthError};
pub use prompt::{render_prompt, render_repair_prompt};
pub use service::{CompletionRequest, CompletionService, HttpCompletionService, HttpServiceConfig};
pub use synthesizer::Synthesizer;

/// Result type for synthesis operations
pub type Result<T> = std::result::Result<T, SynthError>;
