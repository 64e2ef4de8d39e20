use crate::error::{ModelError, Result};
use crate::types::{
    CallSite, CalleeRef, DefKind, Definition, ImportRef, ImportedName, Param, ParsedModule,
    SourceFile,
};
use tree_sitter::{Node, Parser};

/// Tree-sitter based structural parser for Python sources
pub struct PythonParser {
    parser: Parser,
}

impl PythonParser {
    pub fn new() -> Result<Self> {
        let ts_language: tree_sitter::Language = tree_sitter_python::LANGUAGE.into();
        let mut parser = Parser::new();
        parser
            .set_language(&ts_language)
            .map_err(|e| ModelError::tree_sitter(format!("Failed to set language: {e}")))?;

        Ok(Self { parser })
    }

    /// Parse one source file into its structural model.
    ///
    /// Fails with [`ModelError::Syntax`] naming the file and the position of
    /// the first malformed node. The source is never executed.
    pub fn parse_module(&mut self, source: &SourceFile) -> Result<ParsedModule> {
        let tree = self
            .parser
            .parse(&source.text, None)
            .ok_or_else(|| ModelError::NoTree(source.path.clone()))?;

        let root = tree.root_node();
        if root.has_error() {
            return Err(syntax_error(&source.path, &source.text, root));
        }

        let mut imports = Vec::new();
        let mut definitions = Vec::new();

        let mut cursor = root.walk();
        for child in root.children(&mut cursor) {
            match child.kind() {
                "import_statement" => extract_plain_import(child, &source.text, &mut imports),
                "import_from_statement" | "future_import_statement" => {
                    extract_from_import(child, &source.text, &mut imports);
                }
                "function_definition" => {
                    definitions.push(extract_function(child, &source.text, &[], None));
                }
                "class_definition" => {
                    extract_class(child, &source.text, &[], &mut definitions);
                }
                "decorated_definition" => {
                    extract_decorated(child, &source.text, None, &mut definitions);
                }
                _ => {}
            }
        }

        Ok(ParsedModule {
            path: source.path.clone(),
            imports,
            definitions,
        })
    }
}

/// Locate the first malformed node and build a human-readable diagnostic
fn syntax_error(path: &str, text: &str, root: Node) -> ModelError {
    let mut stack = vec![root];
    let mut first: Option<(Node, String)> = None;

    while let Some(node) = stack.pop() {
        if node.is_missing() {
            first = Some((node, format!("missing `{}`", node.kind())));
            break;
        }
        if node.is_error() {
            let snippet: String = node_text(node, text).chars().take(30).collect();
            first = Some((node, format!("unexpected token near `{}`", snippet.trim())));
            break;
        }
        if node.has_error() {
            let mut cursor = node.walk();
            // Push in reverse so the earliest child is inspected first
            let children: Vec<_> = node.children(&mut cursor).collect();
            for child in children.into_iter().rev() {
                if child.has_error() || child.is_error() || child.is_missing() {
                    stack.push(child);
                }
            }
        }
    }

    let (line, column, message) = match first {
        Some((node, message)) => {
            let pos = node.start_position();
            (pos.row + 1, pos.column + 1, message)
        }
        None => (1, 1, "invalid syntax".to_string()),
    };

    ModelError::Syntax {
        path: path.to_string(),
        line,
        column,
        message,
    }
}

fn node_text<'a>(node: Node, text: &'a str) -> &'a str {
    &text[node.start_byte()..node.end_byte()]
}

/// `import a.b, c as d`
fn extract_plain_import(node: Node, text: &str, imports: &mut Vec<ImportRef>) {
    let line = node.start_position().row + 1;
    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        match child.kind() {
            "dotted_name" => imports.push(ImportRef {
                module: node_text(child, text).to_string(),
                alias: None,
                names: vec![],
                line,
            }),
            "aliased_import" => {
                let module = child
                    .child_by_field_name("name")
                    .map(|n| node_text(n, text).to_string())
                    .unwrap_or_default();
                let alias = child
                    .child_by_field_name("alias")
                    .map(|n| node_text(n, text).to_string());
                if !module.is_empty() {
                    imports.push(ImportRef {
                        module,
                        alias,
                        names: vec![],
                        line,
                    });
                }
            }
            _ => {}
        }
    }
}

/// `from a.b import c, d as e` (also relative: `from . import x`)
fn extract_from_import(node: Node, text: &str, imports: &mut Vec<ImportRef>) {
    let line = node.start_position().row + 1;
    let module_node = node.child_by_field_name("module_name");
    let module = module_node
        .map(|n| node_text(n, text).to_string())
        .unwrap_or_default();
    if module.is_empty() {
        return;
    }

    let mut names = Vec::new();
    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        // Skip the module reference itself; the remaining dotted_name /
        // aliased_import children are the imported names
        if let Some(m) = module_node {
            if child.id() == m.id() {
                continue;
            }
        }
        match child.kind() {
            "dotted_name" => names.push(ImportedName {
                name: node_text(child, text).to_string(),
                alias: None,
            }),
            "aliased_import" => {
                let name = child
                    .child_by_field_name("name")
                    .map(|n| node_text(n, text).to_string())
                    .unwrap_or_default();
                let alias = child
                    .child_by_field_name("alias")
                    .map(|n| node_text(n, text).to_string());
                if !name.is_empty() {
                    names.push(ImportedName { name, alias });
                }
            }
            "wildcard_import" => names.push(ImportedName {
                name: "*".to_string(),
                alias: None,
            }),
            _ => {}
        }
    }

    imports.push(ImportRef {
        module,
        alias: None,
        names,
        line,
    });
}

/// `@decorator` wrapper around a function or class
fn extract_decorated(
    node: Node,
    text: &str,
    parent_class: Option<&str>,
    definitions: &mut Vec<Definition>,
) {
    let mut decorators = Vec::new();
    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        if child.kind() == "decorator" {
            // Keep the expression without the leading '@'
            let raw = node_text(child, text).trim_start_matches('@').trim();
            decorators.push(raw.to_string());
        }
    }

    if let Some(definition) = node.child_by_field_name("definition") {
        match definition.kind() {
            "function_definition" => {
                definitions.push(extract_function(definition, text, &decorators, parent_class));
            }
            "class_definition" => {
                extract_class(definition, text, &decorators, definitions);
            }
            _ => {}
        }
    }
}

fn extract_class(
    node: Node,
    text: &str,
    decorators: &[String],
    definitions: &mut Vec<Definition>,
) {
    let name = node
        .child_by_field_name("name")
        .map(|n| node_text(n, text).to_string())
        .unwrap_or_else(|| "<anonymous>".to_string());

    let body = node.child_by_field_name("body");

    definitions.push(Definition {
        name: name.clone(),
        qualified_name: name.clone(),
        kind: DefKind::Class,
        params: vec![],
        return_annotation: None,
        returns_value: false,
        docstring: body.and_then(|b| extract_docstring(b, text)),
        leading_comments: extract_leading_comments(node, text),
        decorators: decorators.to_vec(),
        calls: vec![],
        start_line: node.start_position().row + 1,
        end_line: node.end_position().row + 1,
    });

    // Methods become their own definitions, qualified by the class name
    if let Some(body) = body {
        let mut cursor = body.walk();
        for child in body.children(&mut cursor) {
            match child.kind() {
                "function_definition" => {
                    definitions.push(extract_function(child, text, &[], Some(&name)));
                }
                "decorated_definition" => {
                    extract_decorated(child, text, Some(&name), definitions);
                }
                _ => {}
            }
        }
    }
}

fn extract_function(
    node: Node,
    text: &str,
    decorators: &[String],
    parent_class: Option<&str>,
) -> Definition {
    let name = node
        .child_by_field_name("name")
        .map(|n| node_text(n, text).to_string())
        .unwrap_or_else(|| "<anonymous>".to_string());

    let qualified_name = match parent_class {
        Some(class) => format!("{class}.{name}"),
        None => name.clone(),
    };
    let kind = if parent_class.is_some() {
        DefKind::Method
    } else {
        DefKind::Function
    };

    let params = node
        .child_by_field_name("parameters")
        .map(|p| extract_params(p, text))
        .unwrap_or_default();

    let return_annotation = node
        .child_by_field_name("return_type")
        .map(|n| node_text(n, text).to_string());

    let body = node.child_by_field_name("body");
    let mut calls = Vec::new();
    let mut returns_value = false;
    if let Some(body) = body {
        walk_body(body, text, &mut calls, &mut returns_value);
    }

    Definition {
        name,
        qualified_name,
        kind,
        params,
        return_annotation,
        returns_value,
        docstring: body.and_then(|b| extract_docstring(b, text)),
        leading_comments: extract_leading_comments(node, text),
        decorators: decorators.to_vec(),
        calls,
        start_line: node.start_position().row + 1,
        end_line: node.end_position().row + 1,
    }
}

fn extract_params(params_node: Node, text: &str) -> Vec<Param> {
    let mut params = Vec::new();
    let mut cursor = params_node.walk();

    for child in params_node.children(&mut cursor) {
        match child.kind() {
            "identifier" => params.push(Param {
                name: node_text(child, text).to_string(),
                annotation: None,
                has_default: false,
            }),
            "typed_parameter" => {
                let name = first_identifier(child, text).unwrap_or_default();
                let annotation = child
                    .child_by_field_name("type")
                    .map(|n| node_text(n, text).to_string());
                if !name.is_empty() {
                    params.push(Param {
                        name,
                        annotation,
                        has_default: false,
                    });
                }
            }
            "default_parameter" | "typed_default_parameter" => {
                let name = child
                    .child_by_field_name("name")
                    .map(|n| node_text(n, text).to_string())
                    .unwrap_or_default();
                let annotation = child
                    .child_by_field_name("type")
                    .map(|n| node_text(n, text).to_string());
                if !name.is_empty() {
                    params.push(Param {
                        name,
                        annotation,
                        has_default: true,
                    });
                }
            }
            "list_splat_pattern" | "dictionary_splat_pattern" => {
                if let Some(name) = first_identifier(child, text) {
                    let prefix = if child.kind() == "list_splat_pattern" {
                        "*"
                    } else {
                        "**"
                    };
                    params.push(Param {
                        name: format!("{prefix}{name}"),
                        annotation: None,
                        has_default: false,
                    });
                }
            }
            _ => {}
        }
    }

    params
}

fn first_identifier(node: Node, text: &str) -> Option<String> {
    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        if child.kind() == "identifier" {
            return Some(node_text(child, text).to_string());
        }
    }
    None
}

/// Walk a definition body for call sites and return statements.
///
/// Nested function and class definitions are NOT descended into: their
/// bodies belong to their own definitions, not the enclosing one.
fn walk_body(node: Node, text: &str, calls: &mut Vec<CallSite>, returns_value: &mut bool) {
    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        match child.kind() {
            "function_definition" | "class_definition" => continue,
            "call" => {
                if let Some(function) = child.child_by_field_name("function") {
                    calls.push(CallSite {
                        callee: classify_callee(function, text),
                        line: child.start_position().row + 1,
                    });
                }
                // Fall through: arguments and chained receivers may
                // contain further calls
            }
            "return_statement" => {
                if child.named_child_count() > 0 {
                    *returns_value = true;
                }
            }
            _ => {}
        }
        walk_body(child, text, calls, returns_value);
    }
}

fn classify_callee(function: Node, text: &str) -> CalleeRef {
    match function.kind() {
        "identifier" => CalleeRef::Name(node_text(function, text).to_string()),
        "attribute" => {
            let name = function
                .child_by_field_name("attribute")
                .map(|n| node_text(n, text).to_string())
                .unwrap_or_default();
            let path = node_text(function, text).to_string();
            CalleeRef::Attribute {
                base: attribute_base(function, text),
                path,
                name,
            }
        }
        // Subscripts, nested calls, lambdas: target computed at runtime
        _ => CalleeRef::Dynamic {
            text: node_text(function, text).to_string(),
        },
    }
}

/// Innermost base of an attribute chain, when it is a simple name
fn attribute_base(mut node: Node, text: &str) -> Option<String> {
    loop {
        let object = node.child_by_field_name("object")?;
        match object.kind() {
            "identifier" => return Some(node_text(object, text).to_string()),
            "attribute" => node = object,
            _ => return None,
        }
    }
}

/// Docstring: a string expression as the first statement of a block
fn extract_docstring(body: Node, text: &str) -> Option<String> {
    let first = body.named_child(0)?;
    if first.kind() != "expression_statement" {
        return None;
    }
    let string = first.named_child(0)?;
    if string.kind() != "string" {
        return None;
    }

    // Prefer the string_content children; fall back to quote trimming
    let mut content = String::new();
    let mut cursor = string.walk();
    for child in string.children(&mut cursor) {
        if child.kind() == "string_content" {
            content.push_str(node_text(child, text));
        }
    }
    if content.is_empty() {
        content = node_text(string, text)
            .trim_matches(|c| c == '"' || c == '\'')
            .to_string();
    }

    let trimmed = content.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

/// Comment lines directly above a definition, scanned backwards over the
/// raw text (tree-sitter keeps comments out of the named AST)
fn extract_leading_comments(node: Node, text: &str) -> Vec<String> {
    let start_line = node.start_position().row;
    let lines: Vec<&str> = text.lines().collect();
    if start_line == 0 || start_line > lines.len() {
        return vec![];
    }

    let mut comments = Vec::new();
    let mut idx = start_line;
    while idx > 0 {
        idx -= 1;
        let line = lines[idx].trim();
        if let Some(stripped) = line.strip_prefix('#') {
            comments.push(stripped.trim().to_string());
        } else if line.is_empty() || line.starts_with('@') {
            // Blank lines and decorators sit between comments and the def
            continue;
        } else {
            break;
        }
    }

    comments.reverse();
    comments
}
