//! Read/write built dependency graphs on disk.
//!
//! Each project id gets its own graph file under
//! `<project_root>/.codelink/graphs/`, so several ids may share one root.

use crate::graph::DependencyGraph;
use crate::schema;
use crate::store::check_project_id;
use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};

const CODELINK_DIR: &str = ".codelink";
const GRAPHS_DIR: &str = "graphs";
const GRAPH_SUFFIX: &str = ".json";

/// Get the path to the codelink directory for a given project root.
pub fn codelink_dir(project_root: &Path) -> PathBuf {
    project_root.join(CODELINK_DIR)
}

/// Directory holding the saved graphs of every project id under a root.
pub fn graphs_dir(project_root: &Path) -> PathBuf {
    codelink_dir(project_root).join(GRAPHS_DIR)
}

/// Path of the graph file for `project_id`. Fails on ids that are not a
/// single path component.
pub fn graph_file(project_root: &Path, project_id: &str) -> Result<PathBuf> {
    check_project_id(project_id)?;
    Ok(graphs_dir(project_root).join(format!("{}{}", project_id, GRAPH_SUFFIX)))
}

/// Check if a built graph exists for `project_id`.
pub fn graph_exists(project_root: &Path, project_id: &str) -> bool {
    graph_file(project_root, project_id).is_ok_and(|path| path.exists())
}

/// Load the saved graph of `project_id`.
pub fn load_graph(project_root: &Path, project_id: &str) -> Result<DependencyGraph> {
    let path = graph_file(project_root, project_id)?;
    let json = fs::read_to_string(&path)
        .with_context(|| format!("failed to read graph from {}", path.display()))?;
    schema::from_json(&json)
}

/// Save the graph of `project_id`, replacing any earlier one.
pub fn save_graph(project_root: &Path, project_id: &str, graph: &DependencyGraph) -> Result<()> {
    let path = graph_file(project_root, project_id)?;
    let dir = graphs_dir(project_root);
    fs::create_dir_all(&dir)
        .with_context(|| format!("failed to create graph directory {}", dir.display()))?;

    let json = schema::to_json(graph)?;
    fs::write(&path, json)
        .with_context(|| format!("failed to write graph to {}", path.display()))?;

    Ok(())
}

/// Delete the saved graph of `project_id`. Returns false when there was none.
pub fn remove_graph(project_root: &Path, project_id: &str) -> Result<bool> {
    let path = graph_file(project_root, project_id)?;
    if !path.exists() {
        return Ok(false);
    }
    fs::remove_file(&path)
        .with_context(|| format!("failed to remove graph {}", path.display()))?;
    Ok(true)
}

/// Ensure .codelink is in .gitignore. Returns true if it was already there.
pub fn ensure_gitignore(project_root: &Path) -> Result<bool> {
    let gitignore = project_root.join(".gitignore");

    if gitignore.exists() {
        let content = fs::read_to_string(&gitignore)?;
        if content
            .lines()
            .any(|line| line.trim() == CODELINK_DIR || line.trim() == ".codelink/")
        {
            return Ok(true);
        }
        let mut new_content = content;
        if !new_content.ends_with('\n') {
            new_content.push('\n');
        }
        new_content.push_str("\n# codelink records and graph\n.codelink/\n");
        fs::write(&gitignore, new_content)?;
    } else {
        fs::write(&gitignore, "# codelink records and graph\n.codelink/\n")?;
    }

    Ok(false)
}
