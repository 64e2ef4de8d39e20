use crate::error::{GraphError, Result};
use crate::types::{module_id_from_path, BuildWarning, ImportEdge, ModuleGraph, ModuleNode};
use capcard_code_model::{ImportRef, PythonParser, SourceFile};
use petgraph::graph::{DiGraph, NodeIndex};
use std::collections::{BTreeMap, HashMap, HashSet, VecDeque};

/// Build the module graph from a loaded source tree
pub struct GraphBuilder {
    parser: PythonParser,
}

impl GraphBuilder {
    pub fn new() -> Result<Self> {
        Ok(Self {
            parser: PythonParser::new()?,
        })
    }

    /// Build the graph rooted at `entry_path`.
    ///
    /// The entry file must exist and parse; a syntax error there aborts the
    /// run. Other discovered files that fail to parse are excluded from the
    /// graph and recorded as warnings.
    pub fn build(
        &mut self,
        files: &BTreeMap<String, String>,
        entry_path: &str,
    ) -> Result<ModuleGraph> {
        let entry_text = files
            .get(entry_path)
            .ok_or_else(|| GraphError::EntryNotFound(entry_path.to_string()))?;

        let mut graph = DiGraph::new();
        let mut path_index: HashMap<String, NodeIndex> = HashMap::new();
        let mut warnings: Vec<BuildWarning> = Vec::new();
        let mut failed: HashSet<String> = HashSet::new();

        // Entry parse failure is the one fatal case
        let entry_module = self
            .parser
            .parse_module(&SourceFile::new(entry_path, entry_text.clone()))?;
        let entry = graph.add_node(ModuleNode {
            id: module_id_from_path(entry_path),
            path: entry_path.to_string(),
            module: entry_module,
            import_targets: HashMap::new(),
        });
        path_index.insert(entry_path.to_string(), entry);

        let mut queue = VecDeque::from([entry]);
        while let Some(idx) = queue.pop_front() {
            let imports = graph[idx].module.imports.clone();
            let importer_path = graph[idx].path.clone();

            for import in &imports {
                for (key, target_path) in resolve_import(files, &importer_path, import) {
                    if failed.contains(&target_path) || target_path == importer_path {
                        continue;
                    }

                    let target_idx = match path_index.get(&target_path) {
                        Some(&existing) => Some(existing),
                        None => {
                            let text = files[&target_path].clone();
                            match self
                                .parser
                                .parse_module(&SourceFile::new(&target_path, text))
                            {
                                Ok(module) => {
                                    let node = graph.add_node(ModuleNode {
                                        id: module_id_from_path(&target_path),
                                        path: target_path.clone(),
                                        module,
                                        import_targets: HashMap::new(),
                                    });
                                    path_index.insert(target_path.clone(), node);
                                    queue.push_back(node);
                                    Some(node)
                                }
                                Err(e) => {
                                    log::warn!("Excluding unparseable module: {e}");
                                    warnings.push(BuildWarning {
                                        path: target_path.clone(),
                                        message: e.to_string(),
                                    });
                                    failed.insert(target_path.clone());
                                    None
                                }
                            }
                        }
                    };

                    if let Some(target) = target_idx {
                        graph[idx]
                            .import_targets
                            .insert(key.clone(), target_path.clone());
                        if !graph.contains_edge(idx, target) {
                            graph.add_edge(
                                idx,
                                target,
                                ImportEdge {
                                    reference: import.module.clone(),
                                },
                            );
                        }
                    }
                }
            }
        }

        log::info!(
            "Built module graph: {} modules, {} import edges, {} warnings",
            graph.node_count(),
            graph.edge_count(),
            warnings.len()
        );

        Ok(ModuleGraph {
            graph,
            path_index,
            entry,
            warnings,
        })
    }
}

/// Resolve an import reference to file paths inside the analyzed tree.
///
/// Returns (reference key, path) pairs: the module itself, plus one entry
/// per from-imported name that is itself a submodule. References that match
/// nothing are external and yield no pairs.
fn resolve_import(
    files: &BTreeMap<String, String>,
    importer_path: &str,
    import: &ImportRef,
) -> Vec<(String, String)> {
    let mut resolved = Vec::new();

    if let Some(path) = resolve_reference(files, importer_path, &import.module) {
        resolved.push((import.module.clone(), path));
    }

    // `from pkg import mod` where mod is a submodule file
    for name in &import.names {
        if name.name == "*" {
            continue;
        }
        let dotted = if import.module.ends_with('.') {
            // relative "from . import x" keeps the dot prefix intact
            format!("{}{}", import.module, name.name)
        } else {
            format!("{}.{}", import.module, name.name)
        };
        if let Some(path) = resolve_reference(files, importer_path, &dotted) {
            resolved.push((dotted, path));
        }
    }

    resolved
}

/// Probe candidate paths for one dotted reference, in precedence order
fn resolve_reference(
    files: &BTreeMap<String, String>,
    importer_path: &str,
    reference: &str,
) -> Option<String> {
    let importer_dir = match importer_path.rfind('/') {
        Some(pos) => &importer_path[..pos],
        None => "",
    };

    let mut candidates: Vec<String> = Vec::new();

    if let Some(stripped) = reference.strip_prefix('.') {
        // Relative import: one leading dot is the importer's package,
        // each extra dot climbs one level
        let extra_dots = stripped.len() - stripped.trim_start_matches('.').len();
        let rest = stripped.trim_start_matches('.');
        let mut base: Vec<&str> = if importer_dir.is_empty() {
            vec![]
        } else {
            importer_dir.split('/').collect()
        };
        for _ in 0..extra_dots {
            if base.pop().is_none() {
                return None;
            }
        }
        let base = base.join("/");
        let rest_path = rest.replace('.', "/");
        if rest.is_empty() {
            candidates.push(join(&base, "__init__.py"));
        } else {
            candidates.push(join(&base, &format!("{rest_path}.py")));
            candidates.push(join(&base, &format!("{rest_path}/__init__.py")));
        }
    } else {
        let as_path = reference.replace('.', "/");
        candidates.push(format!("{as_path}.py"));
        candidates.push(format!("{as_path}/__init__.py"));
        if !importer_dir.is_empty() {
            candidates.push(join(importer_dir, &format!("{as_path}.py")));
            candidates.push(join(importer_dir, &format!("{as_path}/__init__.py")));
        }
        // Last resort: a sibling file named after the final segment
        if let Some(last) = reference.rsplit('.').next() {
            if last != reference {
                candidates.push(join(importer_dir, &format!("{last}.py")));
            }
        }
    }

    candidates
        .into_iter()
        .find(|candidate| files.contains_key(candidate))
}

fn join(dir: &str, rest: &str) -> String {
    if dir.is_empty() {
        rest.to_string()
    } else {
        format!("{dir}/{rest}")
    }
}
