//! Two-pass graph construction from source records.
//!
//! Pass 1 adds a file node per record, a function node per declared function
//! and the `contains` edges between them. Pass 2 starts only once every
//! record has been through pass 1, and adds `imports`, `calls` and
//! `calls_ambiguous` edges by name-based resolution.

use crate::resolution::{CallTarget, FunctionIndex, resolve_import};
use anyhow::{Context, Result};
use codelink_core::config::{AmbiguityPolicy, ResolutionConfig};
use codelink_core::graph::{DependencyGraph, EdgeKind, function_id};
use codelink_core::paths;
use codelink_core::record::SourceRecord;
use codelink_core::store::RecordStore;

/// Build a graph from `(relative_path, record)` pairs.
///
/// The result does not depend on the order of `records`. Error-tagged
/// records still produce a file node but contribute no symbols.
pub fn build_graph(
    records: &[(String, SourceRecord)],
    config: &ResolutionConfig,
) -> DependencyGraph {
    let mut graph = DependencyGraph::new();
    let mut functions = FunctionIndex::new();

    let files: Vec<(String, &SourceRecord)> = records
        .iter()
        .map(|(path, record)| (paths::normalize(path), record))
        .collect();

    // Pass 1: nodes and containment.
    for (file_path, record) in &files {
        graph.add_file(file_path);
        for func in &record.functions {
            let id = graph.add_function(file_path, &func.full_name, func.line);
            graph.add_edge(file_path, &id, EdgeKind::Contains);
            functions.insert(file_path, &func.full_name);
        }
    }

    // File ids in sorted order; "first match" for imports follows it.
    let file_ids: Vec<String> = graph.file_nodes().map(|n| n.id().to_string()).collect();

    // Pass 2: references.
    for (file_path, record) in &files {
        for import in &record.imports {
            let target = resolve_import(
                file_ids.iter().map(String::as_str),
                &import.module,
                &config.module_extension,
            );
            match target {
                Some(target) => {
                    graph.add_edge(file_path, target, EdgeKind::Imports);
                }
                None => tracing::debug!("{}: unresolved import {}", file_path, import.module),
            }
        }

        for func in &record.functions {
            let caller = function_id(file_path, &func.full_name);
            for call in &func.calls {
                link_call(
                    &mut graph,
                    &functions,
                    file_path,
                    &caller,
                    &call.callee_name,
                    config.ambiguity,
                );
            }
        }
    }

    graph.refresh_metadata();
    let meta = graph.metadata();
    tracing::info!(
        "built graph: {} files, {} functions, {} edges ({} calls, {} ambiguous, {} imports)",
        meta.total_files,
        meta.total_functions,
        meta.total_edges,
        meta.call_edges,
        meta.ambiguous_call_edges,
        meta.import_edges
    );
    graph
}

fn link_call(
    graph: &mut DependencyGraph,
    functions: &FunctionIndex,
    file_path: &str,
    caller: &str,
    callee_name: &str,
    policy: AmbiguityPolicy,
) {
    match functions.resolve_call(file_path, callee_name) {
        CallTarget::Local(target) => {
            graph.add_edge(caller, &target, EdgeKind::Calls);
        }
        CallTarget::Unique(target) => {
            graph.add_edge(caller, target, EdgeKind::Calls);
        }
        CallTarget::Ambiguous(targets) => match policy {
            AmbiguityPolicy::LinkAll => {
                for target in targets {
                    graph.add_edge(caller, target, EdgeKind::CallsAmbiguous);
                }
            }
            AmbiguityPolicy::Skip => tracing::debug!(
                "{}: skipping ambiguous call {} ({} candidates)",
                caller,
                callee_name,
                targets.len()
            ),
        },
        CallTarget::Unresolved => {
            tracing::debug!("{}: unresolved call {}", caller, callee_name);
        }
    }
}

/// Build the graph of every record stored for `project_id`. A project with
/// no records yields an empty graph.
pub fn build_project_graph(
    store: &dyn RecordStore,
    project_id: &str,
    config: &ResolutionConfig,
) -> Result<DependencyGraph> {
    let records = store
        .load_all(project_id)
        .with_context(|| format!("failed to load records of project {}", project_id))?;
    if records.is_empty() {
        tracing::info!("no records for project {}", project_id);
    }
    Ok(build_graph(&records, config))
}
