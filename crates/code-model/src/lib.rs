//! # Capcard Code Model
//!
//! Structural model of a Python source file, extracted with tree-sitter.
//!
//! ## Architecture
//!
//! ```text
//! Source text
//!     │
//!     ├──> Tree-sitter Parsing → AST
//!     │
//!     ├──> Structural Extraction
//!     │    ├─> Imports (plain, from-import, aliases)
//!     │    ├─> Definitions (functions, classes, methods)
//!     │    │     ├─ Signatures (parameters + annotations)
//!     │    │     ├─ Docstrings and decorators
//!     │    │     └─ Call sites (named, attribute, dynamic)
//!     │    └─> Leading comment capture
//!     │
//!     └──> ParsedModule (immutable per run)
//! ```
//!
//! Parsing is purely structural: the source is never executed. A syntax
//! error yields [`ModelError::Syntax`] naming the file and the position of
//! the first malformed node.

mod error;
mod parser;
mod types;

pub use error::{ModelError, Result};
pub use parser::PythonParser;
pub use types::{
    CallSite, CalleeRef, DefKind, Definition, ImportRef, ImportedName, Param, ParsedModule,
    SourceFile,
};
