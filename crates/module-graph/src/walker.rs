use crate::types::{DefRef, ModuleGraph, ModuleNode};
use capcard_code_model::{CalleeRef, DefKind, Definition};
use petgraph::graph::NodeIndex;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet, VecDeque};

/// Traversal configuration
#[derive(Debug, Clone, Default)]
pub struct WalkerConfig {
    /// Maximum call-edge depth from the entry definitions.
    /// `None` means unbounded (the visited set guards cycles).
    pub max_depth: Option<usize>,
}

/// A call whose target is computed at runtime. Recorded as data so card
/// consumers know static coverage is best-effort, never silently dropped.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct UnresolvedCall {
    /// Path of the module containing the call
    pub module_path: String,

    /// Qualified name of the definition containing the call
    pub definition: String,

    /// Verbatim callee expression
    pub expression: String,

    /// 1-indexed source line
    pub line: usize,
}

/// The subset of definitions reachable from the entry point.
/// Computed once per run; discovery (BFS) order is preserved.
pub struct ReachableSet {
    defs: Vec<DefRef>,
    unresolved: Vec<UnresolvedCall>,
}

impl ReachableSet {
    /// Definition identities in discovery order
    pub fn defs(&self) -> &[DefRef] {
        &self.defs
    }

    /// Dynamic-dispatch call sites encountered during the walk
    pub fn unresolved(&self) -> &[UnresolvedCall] {
        &self.unresolved
    }

    pub fn len(&self) -> usize {
        self.defs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.defs.is_empty()
    }

    /// Resolve to (module, definition) pairs in discovery order
    pub fn definitions<'a>(
        &'a self,
        graph: &'a ModuleGraph,
    ) -> impl Iterator<Item = (&'a ModuleNode, &'a Definition)> + 'a {
        self.defs.iter().filter_map(move |def_ref| {
            let node = graph.node(def_ref.module)?;
            let def = node.module.definitions.get(def_ref.def)?;
            Some((node, def))
        })
    }
}

/// Per-module name resolution tables, built once before the walk
struct ModuleScope {
    /// Module-scope name → definition index (functions and classes)
    locals: HashMap<String, usize>,

    /// (class, method) qualified name → definition index
    methods: HashMap<String, usize>,

    /// From-imported local name → (target module, original name)
    imported_defs: HashMap<String, (NodeIndex, String)>,

    /// Plain-import local alias → target module
    imported_modules: HashMap<String, NodeIndex>,
}

/// Breadth-first reachability over call/reference edges.
///
/// Uses an explicit worklist over definition identities rather than
/// recursion, so deep graphs cannot exhaust the stack.
pub struct ReachabilityWalker {
    config: WalkerConfig,
}

impl ReachabilityWalker {
    pub fn new(config: WalkerConfig) -> Self {
        Self { config }
    }

    /// Walk the graph from the entry module's definitions
    pub fn walk(&self, graph: &ModuleGraph) -> ReachableSet {
        let scopes = build_scopes(graph);

        let mut visited: HashSet<DefRef> = HashSet::new();
        let mut order: Vec<DefRef> = Vec::new();
        let mut unresolved: Vec<UnresolvedCall> = Vec::new();
        let mut queue: VecDeque<(DefRef, usize)> = VecDeque::new();

        // Roots: every definition declared in the entry module
        let entry_node = graph.entry_node();
        for def in 0..entry_node.module.definitions.len() {
            let def_ref = DefRef {
                module: graph.entry,
                def,
            };
            if visited.insert(def_ref) {
                order.push(def_ref);
                queue.push_back((def_ref, 0));
            }
        }

        while let Some((current, depth)) = queue.pop_front() {
            if let Some(max) = self.config.max_depth {
                if depth >= max {
                    continue;
                }
            }

            let Some(node) = graph.node(current.module) else {
                continue;
            };
            let Some(def) = node.module.definitions.get(current.def) else {
                continue;
            };

            let mut enqueue = |target: DefRef| {
                if visited.insert(target) {
                    order.push(target);
                    queue.push_back((target, depth + 1));
                }
            };

            // A reachable class makes its methods reachable (containment)
            if def.kind == DefKind::Class {
                for (idx, candidate) in node.module.definitions.iter().enumerate() {
                    if candidate.kind == DefKind::Method
                        && candidate
                            .qualified_name
                            .strip_prefix(&def.name)
                            .is_some_and(|rest| rest.starts_with('.'))
                    {
                        enqueue(DefRef {
                            module: current.module,
                            def: idx,
                        });
                    }
                }
            }

            for call in &def.calls {
                match &call.callee {
                    CalleeRef::Name(name) => {
                        if let Some(target) = resolve_name(&scopes, current.module, name) {
                            enqueue(target);
                        }
                    }
                    // No target: external attribute call, left for fact
                    // extraction to classify
                    CalleeRef::Attribute { base, name, .. } => {
                        if let Some(target) =
                            resolve_attribute(graph, &scopes, current.module, def, base, name)
                        {
                            enqueue(target);
                        }
                    }
                    CalleeRef::Dynamic { text } => unresolved.push(UnresolvedCall {
                        module_path: node.path.clone(),
                        definition: def.qualified_name.clone(),
                        expression: text.clone(),
                        line: call.line,
                    }),
                }
            }
        }

        log::debug!(
            "Reachability: {} of {} modules' definitions reached, {} unresolved call sites",
            order.len(),
            graph.module_count(),
            unresolved.len()
        );

        ReachableSet {
            defs: order,
            unresolved,
        }
    }
}

fn build_scopes(graph: &ModuleGraph) -> HashMap<NodeIndex, ModuleScope> {
    let mut scopes = HashMap::new();

    for idx in graph.graph.node_indices() {
        let node = &graph.graph[idx];
        let mut locals = HashMap::new();
        let mut methods = HashMap::new();

        for (def_idx, def) in node.module.definitions.iter().enumerate() {
            match def.kind {
                DefKind::Method => {
                    methods.insert(def.qualified_name.clone(), def_idx);
                }
                DefKind::Function | DefKind::Class => {
                    locals.entry(def.name.clone()).or_insert(def_idx);
                }
            }
        }

        let mut imported_defs = HashMap::new();
        let mut imported_modules = HashMap::new();

        for import in &node.module.imports {
            if import.names.is_empty() {
                // `import a.b [as c]`
                if let Some(target_path) = node.import_targets.get(&import.module) {
                    if let Some(target) = graph.find_by_path(target_path) {
                        imported_modules.insert(import.local_name().to_string(), target);
                    }
                }
                continue;
            }

            // `from m import a, b as c`
            if let Some(target_path) = node.import_targets.get(&import.module) {
                if let Some(target) = graph.find_by_path(target_path) {
                    for name in &import.names {
                        if name.name == "*" {
                            continue;
                        }
                        imported_defs.insert(
                            name.local_name().to_string(),
                            (target, name.name.clone()),
                        );
                    }
                }
            }
            // A from-imported submodule behaves like a module alias
            for name in &import.names {
                let dotted = if import.module.ends_with('.') {
                    format!("{}{}", import.module, name.name)
                } else {
                    format!("{}.{}", import.module, name.name)
                };
                if let Some(target_path) = node.import_targets.get(&dotted) {
                    if let Some(target) = graph.find_by_path(target_path) {
                        imported_modules.insert(name.local_name().to_string(), target);
                    }
                }
            }
        }

        scopes.insert(
            idx,
            ModuleScope {
                locals,
                methods,
                imported_defs,
                imported_modules,
            },
        );
    }

    scopes
}

/// Resolve a bare-name call in the given module's scope
fn resolve_name(
    scopes: &HashMap<NodeIndex, ModuleScope>,
    module: NodeIndex,
    name: &str,
) -> Option<DefRef> {
    let scope = scopes.get(&module)?;

    if let Some(&def) = scope.locals.get(name) {
        return Some(DefRef { module, def });
    }

    if let Some((target_module, original)) = scope.imported_defs.get(name) {
        let target_scope = scopes.get(target_module)?;
        if let Some(&def) = target_scope.locals.get(original) {
            return Some(DefRef {
                module: *target_module,
                def,
            });
        }
    }

    None
}

/// Resolve an attribute call: `self.method()`, `mod.func()`, `Class.method()`
fn resolve_attribute(
    graph: &ModuleGraph,
    scopes: &HashMap<NodeIndex, ModuleScope>,
    module: NodeIndex,
    caller: &Definition,
    base: &Option<String>,
    name: &str,
) -> Option<DefRef> {
    let scope = scopes.get(&module)?;
    let base = base.as_deref()?;

    // `self.method()` / `cls.method()` within a method body
    if (base == "self" || base == "cls") && caller.kind == DefKind::Method {
        let class = caller.qualified_name.split('.').next()?;
        let qualified = format!("{class}.{name}");
        if let Some(&def) = scope.methods.get(&qualified) {
            return Some(DefRef { module, def });
        }
        return None;
    }

    // `mod.func()` through a plain import or from-imported submodule
    if let Some(&target_module) = scope.imported_modules.get(base) {
        let target_scope = scopes.get(&target_module)?;
        if let Some(&def) = target_scope.locals.get(name) {
            return Some(DefRef {
                module: target_module,
                def,
            });
        }
        return None;
    }

    // `Class.method()` on a local or from-imported class
    if let Some(class_ref) = resolve_name(scopes, module, base) {
        let class_def = graph.definition(class_ref)?;
        if class_def.kind == DefKind::Class {
            let target_scope = scopes.get(&class_ref.module)?;
            let qualified = format!("{}.{name}", class_def.name);
            if let Some(&def) = target_scope.methods.get(&qualified) {
                return Some(DefRef {
                    module: class_ref.module,
                    def,
                });
            }
        }
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::GraphBuilder;
    use pretty_assertions::assert_eq;
    use std::collections::BTreeMap;

    fn build(entries: &[(&str, &str)], entry: &str) -> ModuleGraph {
        let files: BTreeMap<String, String> = entries
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        GraphBuilder::new().unwrap().build(&files, entry).unwrap()
    }

    fn reachable_names(graph: &ModuleGraph, set: &ReachableSet) -> Vec<String> {
        set.definitions(graph)
            .map(|(node, def)| format!("{}:{}", node.id, def.qualified_name))
            .collect()
    }

    #[test]
    fn test_cross_module_call_reached() {
        let graph = build(
            &[
                ("agent.py", "from tools import search\n\ndef run(q):\n    return search(q)\n"),
                ("tools.py", "def search(q):\n    return q\n\ndef unused():\n    pass\n"),
            ],
            "agent.py",
        );

        let set = ReachabilityWalker::new(WalkerConfig::default()).walk(&graph);
        let names = reachable_names(&graph, &set);

        assert!(names.contains(&"agent:run".to_string()));
        assert!(names.contains(&"tools:search".to_string()));
        assert!(!names.contains(&"tools:unused".to_string()));
    }

    #[test]
    fn test_unimported_module_unreachable() {
        let graph = build(
            &[
                ("agent.py", "def run(q):\n    return q\n"),
                ("orphan.py", "def lonely():\n    pass\n"),
            ],
            "agent.py",
        );

        let set = ReachabilityWalker::new(WalkerConfig::default()).walk(&graph);
        let names = reachable_names(&graph, &set);

        assert_eq!(names, vec!["agent:run".to_string()]);
    }

    #[test]
    fn test_module_alias_call() {
        let graph = build(
            &[
                ("agent.py", "import tools as t\n\ndef run(q):\n    return t.search(q)\n"),
                ("tools.py", "def search(q):\n    return q\n"),
            ],
            "agent.py",
        );

        let set = ReachabilityWalker::new(WalkerConfig::default()).walk(&graph);
        let names = reachable_names(&graph, &set);

        assert!(names.contains(&"tools:search".to_string()));
    }

    #[test]
    fn test_class_pulls_in_methods_and_self_calls() {
        let graph = build(
            &[
                (
                    "agent.py",
                    "from bot import Bot\n\ndef run(q):\n    return Bot().reply(q)\n",
                ),
                (
                    "bot.py",
                    r#"
class Bot:
    def reply(self, q):
        return self.format(q)

    def format(self, q):
        return q
"#,
                ),
            ],
            "agent.py",
        );

        let set = ReachabilityWalker::new(WalkerConfig::default()).walk(&graph);
        let names = reachable_names(&graph, &set);

        assert!(names.contains(&"bot:Bot".to_string()));
        assert!(names.contains(&"bot:Bot.reply".to_string()));
        assert!(names.contains(&"bot:Bot.format".to_string()));
    }

    #[test]
    fn test_mutual_recursion_terminates() {
        let graph = build(
            &[(
                "agent.py",
                "def ping():\n    pong()\n\ndef pong():\n    ping()\n",
            )],
            "agent.py",
        );

        let set = ReachabilityWalker::new(WalkerConfig::default()).walk(&graph);
        assert_eq!(set.len(), 2);
    }

    #[test]
    fn test_depth_bound() {
        let graph = build(
            &[
                ("agent.py", "from a import first\n\ndef run():\n    first()\n"),
                ("a.py", "from b import second\n\ndef first():\n    second()\n"),
                ("b.py", "def second():\n    pass\n"),
            ],
            "agent.py",
        );

        let bounded = ReachabilityWalker::new(WalkerConfig { max_depth: Some(1) }).walk(&graph);
        let names = reachable_names(&graph, &bounded);
        assert!(names.contains(&"a:first".to_string()));
        assert!(!names.contains(&"b:second".to_string()));

        let unbounded = ReachabilityWalker::new(WalkerConfig::default()).walk(&graph);
        let names = reachable_names(&graph, &unbounded);
        assert!(names.contains(&"b:second".to_string()));
    }

    #[test]
    fn test_dynamic_call_recorded() {
        let graph = build(
            &[(
                "agent.py",
                "def run(q):\n    handlers[q]()\n",
            )],
            "agent.py",
        );

        let set = ReachabilityWalker::new(WalkerConfig::default()).walk(&graph);
        assert_eq!(set.unresolved().len(), 1);
        assert_eq!(set.unresolved()[0].definition, "run");
        assert_eq!(set.unresolved()[0].expression, "handlers[q]");
    }

    #[test]
    fn test_discovery_order_is_bfs() {
        let graph = build(
            &[
                (
                    "agent.py",
                    "from tools import search\n\ndef run(q):\n    return search(q)\n\ndef setup():\n    pass\n",
                ),
                ("tools.py", "def search(q):\n    return q\n"),
            ],
            "agent.py",
        );

        let set = ReachabilityWalker::new(WalkerConfig::default()).walk(&graph);
        let names = reachable_names(&graph, &set);

        // Entry definitions first (source order), then discovered callees
        assert_eq!(
            names,
            vec![
                "agent:run".to_string(),
                "agent:setup".to_string(),
                "tools:search".to_string(),
            ]
        );
    }
}
