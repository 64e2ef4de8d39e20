use thiserror::Error;

/// Result type for code-model operations
pub type Result<T> = std::result::Result<T, ModelError>;

/// Errors that can occur while building the structural model
#[derive(Error, Debug)]
pub enum ModelError {
    /// The source contains a syntax error
    #[error("Syntax error in {path} at line {line}, column {column}: {message}")]
    Syntax {
        path: String,
        line: usize,
        column: usize,
        message: String,
    },

    /// Tree-sitter rejected the grammar
    #[error("Tree-sitter error: {0}")]
    TreeSitter(String),

    /// The parser produced no tree at all
    #[error("Parse failure in {0}: no syntax tree produced")]
    NoTree(String),
}

impl ModelError {
    /// Create a tree-sitter error
    pub fn tree_sitter(msg: impl Into<String>) -> Self {
        Self::TreeSitter(msg.into())
    }

    /// File path the error refers to, if any
    pub fn path(&self) -> Option<&str> {
        match self {
            Self::Syntax { path, .. } | Self::NoTree(path) => Some(path),
            Self::TreeSitter(_) => None,
        }
    }
}
