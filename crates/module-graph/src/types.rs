use capcard_code_model::{Definition, ParsedModule};
use petgraph::graph::{DiGraph, NodeIndex};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// One module in the graph
#[derive(Debug, Clone)]
pub struct ModuleNode {
    /// Dotted module identifier derived from the path
    /// ("tools/search.py" → "tools.search")
    pub id: String,

    /// Source path (unique key)
    pub path: String,

    /// Structural model of the module
    pub module: ParsedModule,

    /// Import reference → resolved file path, for references that point
    /// inside the analyzed tree. Unresolved references are external
    /// (stdlib/third-party) and stay opaque.
    pub import_targets: HashMap<String, String>,
}

/// Edge weight: one import relationship
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImportEdge {
    /// The dotted reference as written at the import site
    pub reference: String,
}

/// Non-fatal problem recorded while building the graph
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct BuildWarning {
    pub path: String,
    pub message: String,
}

impl std::fmt::Display for BuildWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.path, self.message)
    }
}

/// Identity of one definition: (module node, index into its definitions).
/// Used as the visited-set key during reachability traversal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DefRef {
    pub module: NodeIndex,
    pub def: usize,
}

/// Module graph for one run: directed, may contain cycles
pub struct ModuleGraph {
    /// Directed graph (importer → imported)
    pub graph: DiGraph<ModuleNode, ImportEdge>,

    /// Path → NodeIndex mapping for fast lookup
    pub path_index: HashMap<String, NodeIndex>,

    /// The entry module all reachability starts from
    pub entry: NodeIndex,

    /// Files that were found but excluded (unparseable non-entry files)
    pub warnings: Vec<BuildWarning>,
}

impl ModuleGraph {
    /// Get a module node
    pub fn node(&self, idx: NodeIndex) -> Option<&ModuleNode> {
        self.graph.node_weight(idx)
    }

    /// Get the entry module
    pub fn entry_node(&self) -> &ModuleNode {
        &self.graph[self.entry]
    }

    /// Find a module by source path
    pub fn find_by_path(&self, path: &str) -> Option<NodeIndex> {
        self.path_index.get(path).copied()
    }

    /// Resolve a DefRef to its definition
    pub fn definition(&self, def_ref: DefRef) -> Option<&Definition> {
        self.graph
            .node_weight(def_ref.module)
            .and_then(|n| n.module.definitions.get(def_ref.def))
    }

    /// Get module count
    pub fn module_count(&self) -> usize {
        self.graph.node_count()
    }

    /// Get import edge count
    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }
}

/// Derive a dotted module identifier from a source path
pub(crate) fn module_id_from_path(path: &str) -> String {
    let trimmed = path
        .trim_start_matches("./")
        .trim_end_matches(".py")
        .trim_end_matches("/__init__");
    trimmed.replace('/', ".")
}
