//! Tree-sitter integration.

use anyhow::{Context, Result};
use std::path::Path;

/// Parse a source file and return the tree-sitter tree.
pub fn parse_file(
    path: &Path,
    source: &[u8],
    language: &tree_sitter::Language,
) -> Result<tree_sitter::Tree> {
    let mut parser = tree_sitter::Parser::new();
    parser
        .set_language(language)
        .context("failed to set tree-sitter language")?;
    parser
        .parse(source, None)
        .ok_or_else(|| anyhow::anyhow!("failed to parse {}", path.display()))
}

/// First error or missing node under `node`, in document order.
pub fn first_error(node: tree_sitter::Node<'_>) -> Option<tree_sitter::Node<'_>> {
    if node.is_error() || node.is_missing() {
        return Some(node);
    }
    if !node.has_error() {
        return None;
    }
    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        if let Some(found) = first_error(child) {
            return Some(found);
        }
    }
    None
}
