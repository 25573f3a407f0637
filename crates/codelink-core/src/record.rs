//! Per-file extraction records.
//!
//! A [`SourceRecord`] is produced once per source file by the extractor and is
//! immutable afterwards. Methods live in the flat `functions` list; a class only
//! refers to them by index.

use serde::{Deserialize, Serialize};

/// Structured extraction output for one source file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceRecord {
    /// Path as handed to the extractor.
    pub file_path: String,
    /// Set when extraction failed; the symbol lists are then empty.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default)]
    pub imports: Vec<ImportDecl>,
    #[serde(default)]
    pub classes: Vec<ClassDecl>,
    /// Every function in the file, top-level and nested, in declaration order.
    /// This list owns the declarations; classes hold indices into it.
    #[serde(default)]
    pub functions: Vec<FunctionDecl>,
}

/// One imported name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportDecl {
    /// Dotted module path. For from-style imports this is `from_module.name`.
    pub module: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alias: Option<String>,
    /// The `from` part of a from-style import (empty for relative-root imports).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from_module: Option<String>,
    pub line: usize,
}

/// A class declaration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassDecl {
    pub name: String,
    pub line: usize,
    pub end_line: usize,
    #[serde(default)]
    pub bases: Vec<String>,
    /// Indices into [`SourceRecord::functions`].
    #[serde(default)]
    pub methods: Vec<usize>,
}

/// A function or method declaration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FunctionDecl {
    pub name: String,
    /// `parent.name` when nested in a class or function, else `name`.
    pub full_name: String,
    pub line: usize,
    pub end_line: usize,
    #[serde(default)]
    pub params: Vec<String>,
    #[serde(default)]
    pub is_async: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent: Option<String>,
    #[serde(default)]
    pub calls: Vec<CallSite>,
}

/// A call expression attributed to its enclosing function.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallSite {
    /// Textual rendering of the call target (`foo`, `a.b.c`, `x[]`, `Call(...)`).
    pub callee_name: String,
    pub line: usize,
    pub arg_count: usize,
}

impl SourceRecord {
    /// An empty record for `file_path`.
    pub fn new(file_path: impl Into<String>) -> Self {
        Self {
            file_path: file_path.into(),
            ..Self::default()
        }
    }

    /// An error-tagged record: contributes no symbols downstream.
    pub fn failed(file_path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            file_path: file_path.into(),
            error: Some(message.into()),
            ..Self::default()
        }
    }

    pub fn is_failed(&self) -> bool {
        self.error.is_some()
    }

    /// Resolve a class's method indices against this record's function list.
    /// Out-of-range indices (a hand-edited record) are skipped.
    pub fn methods_of<'a>(&'a self, class: &'a ClassDecl) -> impl Iterator<Item = &'a FunctionDecl> {
        class.methods.iter().filter_map(|&i| self.functions.get(i))
    }

    pub fn find_function(&self, full_name: &str) -> Option<&FunctionDecl> {
        self.functions.iter().find(|f| f.full_name == full_name)
    }

    pub fn find_class(&self, name: &str) -> Option<&ClassDecl> {
        self.classes.iter().find(|c| c.name == name)
    }

    /// Total number of call sites across all functions.
    pub fn call_count(&self) -> usize {
        self.functions.iter().map(|f| f.calls.len()).sum()
    }
}
