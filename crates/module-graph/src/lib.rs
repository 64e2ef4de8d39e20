//! # Capcard Module Graph
//!
//! Links parsed Python modules into a directed import graph rooted at the
//! agent's entry file, and computes the subset of definitions reachable
//! from the entry point.
//!
//! ## Architecture
//!
//! ```text
//! file map + entry path
//!     │
//!     ├──> Graph Builder
//!     │      ├─ Parse entry (syntax error here is fatal)
//!     │      ├─ Resolve imports by candidate probing
//!     │      ├─ Parse discovered modules (failures → warnings)
//!     │      └─ Build edges (import relationships, cycles allowed)
//!     │
//!     ├──> Module Graph (petgraph)
//!     │      ├─ Nodes: modules with their definitions
//!     │      └─ Edges: import references
//!     │
//!     └──> Reachability Walker
//!            ├─ BFS over call/reference edges (explicit worklist)
//!            ├─ Visited set keyed by definition identity
//!            ├─ Configurable depth bound, cycle-safe
//!            └─ Dynamic call targets surfaced, never dropped
//! ```

mod builder;
mod error;
mod types;
mod walker;

pub use builder::GraphBuilder;
pub use error::{GraphError, Result};
pub use types::{BuildWarning, DefRef, ImportEdge, ModuleGraph, ModuleNode};
pub use walker::{ReachabilityWalker, ReachableSet, UnresolvedCall, WalkerConfig};
