//! # Capcard Facts
//!
//! Turns reachable definitions into a deduplicated fact base that drives
//! card synthesis.
//!
//! ## Architecture
//!
//! ```text
//! ReachableSet (definitions in discovery order)
//!     │
//!     ├──> Fact Extractor (per definition, pattern tables)
//!     │      ├─ Annotated parameters     → InputParam
//!     │      ├─ Returns / annotations    → OutputValue
//!     │      ├─ Known tool identifiers   → ToolInvocation
//!     │      ├─ Declared capabilities    → CapabilityTag
//!     │      └─ Side-effecting calls     → SideEffect
//!     │
//!     └──> Fact Aggregator
//!            ├─ Dedup by (kind, normalized name)
//!            ├─ Highest confidence wins
//!            └─ Ties broken by earliest discovery
//! ```
//!
//! Extraction never fails a run: malformed shapes degrade to zero findings
//! for that definition and a logged warning.

mod aggregator;
mod config;
mod extractor;
mod types;

pub use aggregator::aggregate;
pub use config::ExtractorConfig;
pub use extractor::Extractor;
pub use types::{Confidence, FactBase, Finding, FindingKind};

use thiserror::Error;

/// Result type for facts operations
pub type Result<T> = std::result::Result<T, FactsError>;

/// Errors that can occur while configuring fact extraction
#[derive(Error, Debug)]
pub enum FactsError {
    /// A configured capability pattern is not a valid regex
    #[error("Invalid capability pattern `{pattern}`: {message}")]
    InvalidPattern { pattern: String, message: String },

    /// An identifier list entry is unusable
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}
