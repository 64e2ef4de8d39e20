use capcard_code_model::ModelError;
use thiserror::Error;

/// Result type for module-graph operations
pub type Result<T> = std::result::Result<T, GraphError>;

#[derive(Error, Debug)]
pub enum GraphError {
    /// The entry file is missing from the loaded source tree
    #[error("Entry file not found: {0}")]
    EntryNotFound(String),

    /// The entry file failed to parse; the run cannot proceed
    #[error(transparent)]
    Parse(#[from] ModelError),
}
