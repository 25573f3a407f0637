//! Python symbol extraction.
//!
//! One depth-first walk over the tree-sitter syntax tree collects imports,
//! classes, functions and call sites. Lexical context is an explicit scope
//! stack:
//!
//! - the *current class* is the innermost class scope anywhere on the stack,
//!   so a function nested in a method still reports the class as its parent;
//! - a function's parent is the current class name, else the name of the
//!   innermost enclosing function;
//! - a call is attributed to the innermost function scope, and calls outside
//!   any function are not recorded.

use crate::languages::Language;
use crate::treesitter;
use codelink_core::record::{CallSite, ClassDecl, FunctionDecl, ImportDecl, SourceRecord};
use std::path::Path;
use tree_sitter::Node;

/// Extraction failure for a single file.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Parse Error: {message}")]
pub struct ExtractionError {
    pub file_path: String,
    pub message: String,
}

impl ExtractionError {
    fn new(file_path: &str, message: impl Into<String>) -> Self {
        Self {
            file_path: file_path.to_string(),
            message: message.into(),
        }
    }
}

/// Extract the symbols of one Python file.
///
/// `file_path` is recorded verbatim. Source that does not parse cleanly
/// yields an [`ExtractionError`] describing the first syntax error.
pub fn extract(file_path: &str, content: &str) -> Result<SourceRecord, ExtractionError> {
    let language = Language::Python.ts_language();
    let tree = treesitter::parse_file(Path::new(file_path), content.as_bytes(), &language)
        .map_err(|e| ExtractionError::new(file_path, e.to_string()))?;
    let root = tree.root_node();

    if root.has_error() {
        let at = treesitter::first_error(root).unwrap_or(root);
        let pos = at.start_position();
        return Err(ExtractionError::new(
            file_path,
            format!(
                "invalid syntax at line {}, column {}",
                pos.row + 1,
                pos.column + 1
            ),
        ));
    }

    let mut extractor = Extractor::new(file_path, content);
    extractor.visit(root);
    Ok(extractor.record)
}

/// Like [`extract`], but folds a failure into an error-tagged record.
pub fn extract_or_failed(file_path: &str, content: &str) -> SourceRecord {
    match extract(file_path, content) {
        Ok(record) => record,
        Err(e) => {
            tracing::debug!("{}: {}", file_path, e);
            SourceRecord::failed(file_path, e.to_string())
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum Scope {
    Class(usize),
    Function(usize),
}

struct Extractor<'s> {
    source: &'s str,
    record: SourceRecord,
    scopes: Vec<Scope>,
}

impl<'s> Extractor<'s> {
    fn new(file_path: &str, source: &'s str) -> Self {
        Self {
            source,
            record: SourceRecord::new(file_path),
            scopes: Vec::new(),
        }
    }

    fn text(&self, node: Node<'_>) -> &'s str {
        &self.source[node.byte_range()]
    }

    fn current_class(&self) -> Option<usize> {
        self.scopes.iter().rev().find_map(|s| match s {
            Scope::Class(i) => Some(*i),
            Scope::Function(_) => None,
        })
    }

    fn current_function(&self) -> Option<usize> {
        self.scopes.iter().rev().find_map(|s| match s {
            Scope::Function(i) => Some(*i),
            Scope::Class(_) => None,
        })
    }

    fn visit(&mut self, node: Node<'_>) {
        match node.kind() {
            "import_statement" => self.visit_import(node),
            "import_from_statement" | "future_import_statement" => self.visit_import_from(node),
            "class_definition" => self.visit_class(node, &[]),
            "function_definition" => self.visit_function(node, &[]),
            "decorated_definition" => self.visit_decorated(node),
            "call" => self.visit_call(node),
            _ => self.visit_children(node),
        }
    }

    fn visit_children(&mut self, node: Node<'_>) {
        let mut cursor = node.walk();
        for child in node.children(&mut cursor) {
            self.visit(child);
        }
    }

    // -- imports --

    fn visit_import(&mut self, node: Node<'_>) {
        let line = line_of(node);
        let mut cursor = node.walk();
        for name in node.children_by_field_name("name", &mut cursor) {
            let (module, alias) = self.imported_name(name);
            self.record.imports.push(ImportDecl {
                module,
                alias,
                from_module: None,
                line,
            });
        }
    }

    fn visit_import_from(&mut self, node: Node<'_>) {
        let line = line_of(node);
        let from = if node.kind() == "future_import_statement" {
            "__future__".to_string()
        } else {
            node.child_by_field_name("module_name")
                .map(|m| self.module_name(m))
                .unwrap_or_default()
        };

        let mut names: Vec<(String, Option<String>)> = Vec::new();
        let mut cursor = node.walk();
        for name in node.children_by_field_name("name", &mut cursor) {
            names.push(self.imported_name(name));
        }
        let mut cursor = node.walk();
        if node
            .children(&mut cursor)
            .any(|c| c.kind() == "wildcard_import")
        {
            names.push(("*".to_string(), None));
        }

        for (name, alias) in names {
            let module = if from.is_empty() {
                name
            } else {
                format!("{}.{}", from, name)
            };
            self.record.imports.push(ImportDecl {
                module,
                alias,
                from_module: Some(from.clone()),
                line,
            });
        }
    }

    /// `from` target: a dotted name, or the dotted part of a relative import
    /// (empty for a bare `from . import x`).
    fn module_name(&self, node: Node<'_>) -> String {
        match node.kind() {
            "relative_import" => {
                let mut cursor = node.walk();
                node.named_children(&mut cursor)
                    .find(|c| c.kind() == "dotted_name")
                    .map(|c| self.text(c).to_string())
                    .unwrap_or_default()
            }
            _ => self.text(node).to_string(),
        }
    }

    fn imported_name(&self, node: Node<'_>) -> (String, Option<String>) {
        if node.kind() == "aliased_import" {
            let name = node
                .child_by_field_name("name")
                .map(|n| self.text(n).to_string())
                .unwrap_or_default();
            let alias = node
                .child_by_field_name("alias")
                .map(|a| self.text(a).to_string());
            (name, alias)
        } else {
            (self.text(node).to_string(), None)
        }
    }

    // -- definitions --

    fn visit_decorated(&mut self, node: Node<'_>) {
        let mut cursor = node.walk();
        let decorators: Vec<Node<'_>> = node
            .named_children(&mut cursor)
            .filter(|c| c.kind() == "decorator")
            .collect();

        match node.child_by_field_name("definition") {
            Some(def) if def.kind() == "function_definition" => self.visit_function(def, &decorators),
            Some(def) if def.kind() == "class_definition" => self.visit_class(def, &decorators),
            _ => self.visit_children(node),
        }
    }

    fn visit_class(&mut self, node: Node<'_>, decorators: &[Node<'_>]) {
        let Some(name_node) = node.child_by_field_name("name") else {
            self.visit_children(node);
            return;
        };

        let bases = node
            .child_by_field_name("superclasses")
            .map(|args| self.bases(args))
            .unwrap_or_default();

        let index = self.record.classes.len();
        self.record.classes.push(ClassDecl {
            name: self.text(name_node).to_string(),
            line: line_of(node),
            end_line: end_line_of(node),
            bases,
            methods: Vec::new(),
        });

        self.scopes.push(Scope::Class(index));
        self.visit_children(node);
        for decorator in decorators {
            self.visit(*decorator);
        }
        self.scopes.pop();
    }

    /// Positional entries of a class's base list; keyword arguments such as
    /// `metaclass=` are not bases.
    fn bases(&self, args: Node<'_>) -> Vec<String> {
        let mut cursor = args.walk();
        args.named_children(&mut cursor)
            .filter(|c| {
                !matches!(
                    c.kind(),
                    "keyword_argument" | "dictionary_splat" | "comment"
                )
            })
            .map(|c| self.render(c))
            .collect()
    }

    fn visit_function(&mut self, node: Node<'_>, decorators: &[Node<'_>]) {
        let Some(name_node) = node.child_by_field_name("name") else {
            self.visit_children(node);
            return;
        };
        let name = self.text(name_node).to_string();

        let class = self.current_class();
        let parent = match class {
            Some(c) => Some(self.record.classes[c].name.clone()),
            None => self
                .current_function()
                .map(|f| self.record.functions[f].name.clone()),
        };
        let full_name = match &parent {
            Some(p) => format!("{}.{}", p, name),
            None => name.clone(),
        };

        let mut cursor = node.walk();
        let is_async = node.children(&mut cursor).any(|c| c.kind() == "async");
        let params = node
            .child_by_field_name("parameters")
            .map(|p| self.params(p))
            .unwrap_or_default();

        let index = self.record.functions.len();
        self.record.functions.push(FunctionDecl {
            name,
            full_name,
            line: line_of(node),
            end_line: end_line_of(node),
            params,
            is_async,
            parent,
            calls: Vec::new(),
        });
        if let Some(c) = class {
            self.record.classes[c].methods.push(index);
        }

        self.scopes.push(Scope::Function(index));
        self.visit_children(node);
        for decorator in decorators {
            self.visit(*decorator);
        }
        self.scopes.pop();
    }

    /// Names of the regular positional-or-keyword parameters. Positional-only
    /// parameters (before `/`) and everything from `*`/`*args` on are left out.
    fn params(&self, parameters: Node<'_>) -> Vec<String> {
        let mut names = Vec::new();
        let mut cursor = parameters.walk();
        for child in parameters.named_children(&mut cursor) {
            match child.kind() {
                "identifier" => names.push(self.text(child).to_string()),
                "default_parameter" | "typed_default_parameter" => {
                    if let Some(name) = child.child_by_field_name("name") {
                        names.push(self.text(name).to_string());
                    }
                }
                "typed_parameter" => {
                    let mut inner_cursor = child.walk();
                    match child.named_children(&mut inner_cursor).next() {
                        Some(inner) if inner.kind() == "identifier" => {
                            names.push(self.text(inner).to_string());
                        }
                        Some(inner) if inner.kind() == "list_splat_pattern" => break,
                        _ => {}
                    }
                }
                "positional_separator" => names.clear(),
                "keyword_separator" | "list_splat_pattern" => break,
                _ => {}
            }
        }
        names
    }

    // -- calls --

    fn visit_call(&mut self, node: Node<'_>) {
        let Some(func) = self.current_function() else {
            return;
        };

        let callee_name = node
            .child_by_field_name("function")
            .map(|f| self.render(f))
            .unwrap_or_else(|| "unknown".to_string());
        let arg_count = node
            .child_by_field_name("arguments")
            .map(positional_arg_count)
            .unwrap_or(0);

        self.record.functions[func].calls.push(CallSite {
            callee_name,
            line: line_of(node),
            arg_count,
        });

        self.visit_children(node);
    }

    /// Textual form of an expression used as a call target or base class.
    fn render(&self, node: Node<'_>) -> String {
        match node.kind() {
            "identifier" => self.text(node).to_string(),
            "attribute" => {
                let object = node
                    .child_by_field_name("object")
                    .map(|o| self.render(o))
                    .unwrap_or_else(|| "unknown".to_string());
                match node.child_by_field_name("attribute") {
                    Some(attr) => format!("{}.{}", object, self.text(attr)),
                    None => object,
                }
            }
            "subscript" => {
                let value = node
                    .child_by_field_name("value")
                    .map(|v| self.render(v))
                    .unwrap_or_else(|| "unknown".to_string());
                format!("{}[]", value)
            }
            "call" => "Call(...)".to_string(),
            "parenthesized_expression" => {
                let mut cursor = node.walk();
                node.named_children(&mut cursor)
                    .find(|c| c.kind() != "comment")
                    .map(|inner| self.render(inner))
                    .unwrap_or_else(|| "unknown".to_string())
            }
            _ => "unknown".to_string(),
        }
    }
}

/// Positional arguments of a call, starred ones included; keyword arguments
/// and `**kwargs` do not count. A bare generator argument counts as one.
fn positional_arg_count(arguments: Node<'_>) -> usize {
    if arguments.kind() == "generator_expression" {
        return 1;
    }
    let mut cursor = arguments.walk();
    arguments
        .named_children(&mut cursor)
        .filter(|c| {
            !matches!(
                c.kind(),
                "keyword_argument" | "dictionary_splat" | "comment"
            )
        })
        .count()
}

fn line_of(node: Node<'_>) -> usize {
    node.start_position().row + 1
}

fn end_line_of(node: Node<'_>) -> usize {
    let start = node.start_position();
    let end = node.end_position();
    // A node ending at column 0 stops at the newline of the previous row.
    if end.column == 0 && end.row > start.row {
        end.row
    } else {
        end.row + 1
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scope_tracking_nested_class_in_function() {
        let source = "\
def factory():
    class Built:
        def go(self):
            make()
    return Built
";
        let record = extract("f.py", source).unwrap();
        let go = record.find_function("Built.go").unwrap();
        assert_eq!(go.parent.as_deref(), Some("Built"));
        assert_eq!(go.calls[0].callee_name, "make");
        assert_eq!(record.classes[0].methods, vec![1]);
    }

    #[test]
    fn test_end_line_of_function() {
        let source = "def f():\n    x = 1\n    return x\n\n\ny = 2\n";
        let record = extract("f.py", source).unwrap();
        assert_eq!(record.functions[0].line, 1);
        assert_eq!(record.functions[0].end_line, 3);
    }

    #[test]
    fn test_extraction_error_display() {
        let err = extract("bad.py", "def broken(:\n").unwrap_err();
        assert_eq!(err.file_path, "bad.py");
        assert!(err.to_string().starts_with("Parse Error: invalid syntax at line 1"));
    }
}
