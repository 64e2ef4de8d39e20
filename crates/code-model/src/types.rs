use serde::{Deserialize, Serialize};

/// A loaded source file: path plus raw text
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SourceFile {
    /// Path relative to the analysis root, '/'-separated (unique key)
    pub path: String,

    /// Raw source text
    pub text: String,
}

impl SourceFile {
    pub fn new(path: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            text: text.into(),
        }
    }
}

/// Kind of a definition
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DefKind {
    Function,
    Method,
    Class,
}

impl DefKind {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Function => "function",
            Self::Method => "method",
            Self::Class => "class",
        }
    }
}

/// One parameter of a function or method signature
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Param {
    /// Parameter name
    pub name: String,

    /// Declared type annotation, verbatim (e.g. "str", "list[int]")
    pub annotation: Option<String>,

    /// Whether the parameter carries a default value
    pub has_default: bool,
}

/// How a call site names its target
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub enum CalleeRef {
    /// Plain name call: `foo(...)`
    Name(String),

    /// Attribute call: `obj.method(...)` or `mod.sub.func(...)`
    Attribute {
        /// Innermost base, when it is a simple name ("obj", "requests")
        base: Option<String>,
        /// Full dotted path as written ("requests.sessions.get")
        path: String,
        /// Final attribute name ("get")
        name: String,
    },

    /// Target computed at runtime: `handlers[i](...)`, `getattr(m, n)(...)`
    Dynamic {
        /// Verbatim callee expression, for diagnostics
        text: String,
    },
}

impl CalleeRef {
    /// The dotted name of the target, when statically known
    pub fn dotted(&self) -> Option<&str> {
        match self {
            Self::Name(n) => Some(n),
            Self::Attribute { path, .. } => Some(path),
            Self::Dynamic { .. } => None,
        }
    }
}

/// A call expression discovered inside a definition body
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CallSite {
    pub callee: CalleeRef,

    /// 1-indexed source line
    pub line: usize,
}

/// A function, method, or class within a module
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Definition {
    /// Bare name ("run")
    pub name: String,

    /// Qualified name within the module ("Agent.run" for methods)
    pub qualified_name: String,

    pub kind: DefKind,

    /// Ordered parameter list; empty for classes
    pub params: Vec<Param>,

    /// Declared return annotation, verbatim
    pub return_annotation: Option<String>,

    /// Whether the body contains a `return <expr>` statement
    pub returns_value: bool,

    /// Docstring text, quotes stripped
    pub docstring: Option<String>,

    /// Comment lines directly preceding the definition
    pub leading_comments: Vec<String>,

    /// Decorator expressions, verbatim, treated as opaque tags
    pub decorators: Vec<String>,

    /// Call sites inside the body (nested definitions excluded)
    pub calls: Vec<CallSite>,

    /// 1-indexed line span
    pub start_line: usize,
    pub end_line: usize,
}

impl Definition {
    /// Whether this definition declares an output, explicitly or implicitly
    #[must_use]
    pub fn has_output(&self) -> bool {
        self.return_annotation.is_some() || self.returns_value
    }
}

/// One imported name in a from-import: `from m import name as alias`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ImportedName {
    pub name: String,
    pub alias: Option<String>,
}

impl ImportedName {
    /// The name this import binds in the importing module
    pub fn local_name(&self) -> &str {
        self.alias.as_deref().unwrap_or(&self.name)
    }
}

/// An import reference to another module
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ImportRef {
    /// Dotted module reference as written; leading dots kept for
    /// relative imports (".tools", "..common.util")
    pub module: String,

    /// Alias for a plain `import module as alias`
    pub alias: Option<String>,

    /// Names bound by a from-import; empty for plain imports
    pub names: Vec<ImportedName>,

    /// 1-indexed source line
    pub line: usize,
}

impl ImportRef {
    /// The name a plain import binds in the importing module
    /// (`import a.b` binds "a", `import a.b as c` binds "c")
    pub fn local_name(&self) -> &str {
        if let Some(alias) = &self.alias {
            alias
        } else {
            self.module.split('.').next().unwrap_or(&self.module)
        }
    }
}

/// The structural model of one parsed source file
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ParsedModule {
    /// Source path (unique key, same as the SourceFile it came from)
    pub path: String,

    /// All imports, in source order
    pub imports: Vec<ImportRef>,

    /// Top-level functions, classes, and class methods, in source order
    pub definitions: Vec<Definition>,
}

impl ParsedModule {
    /// Find a definition by bare name (module scope: functions and classes)
    pub fn find_definition(&self, name: &str) -> Option<usize> {
        self.definitions
            .iter()
            .position(|d| d.kind != DefKind::Method && d.name == name)
    }

    /// Find a method of a class by (class, method) names
    pub fn find_method(&self, class: &str, method: &str) -> Option<usize> {
        let qualified = format!("{class}.{method}");
        self.definitions
            .iter()
            .position(|d| d.kind == DefKind::Method && d.qualified_name == qualified)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_import_local_name() {
        let plain = ImportRef {
            module: "requests".to_string(),
            alias: None,
            names: vec![],
            line: 1,
        };
        assert_eq!(plain.local_name(), "requests");

        let dotted = ImportRef {
            module: "a.b.c".to_string(),
            alias: None,
            names: vec![],
            line: 1,
        };
        assert_eq!(dotted.local_name(), "a");

        let aliased = ImportRef {
            module: "numpy".to_string(),
            alias: Some("np".to_string()),
            names: vec![],
            line: 1,
        };
        assert_eq!(aliased.local_name(), "np");
    }

    #[test]
    fn test_imported_name_local() {
        let name = ImportedName {
            name: "search".to_string(),
            alias: Some("s".to_string()),
        };
        assert_eq!(name.local_name(), "s");

        let bare = ImportedName {
            name: "search".to_string(),
            alias: None,
        };
        assert_eq!(bare.local_name(), "search");
    }

    #[test]
    fn test_callee_dotted() {
        assert_eq!(CalleeRef::Name("foo".to_string()).dotted(), Some("foo"));
        let attr = CalleeRef::Attribute {
            base: Some("requests".to_string()),
            path: "requests.get".to_string(),
            name: "get".to_string(),
        };
        assert_eq!(attr.dotted(), Some("requests.get"));
        let dynamic = CalleeRef::Dynamic {
            text: "handlers[0]".to_string(),
        };
        assert_eq!(dynamic.dotted(), None);
    }
}
