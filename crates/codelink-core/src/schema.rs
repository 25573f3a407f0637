//! JSON encoding and version handling for serialized graphs.

use crate::graph::{DependencyGraph, GRAPH_VERSION, SerializedGraph};
use anyhow::{Context, Result};

/// Validate a serialized graph's schema version.
pub fn validate_version(serialized: &SerializedGraph) -> Result<()> {
    if serialized.version != GRAPH_VERSION {
        anyhow::bail!(
            "graph version mismatch: expected {}, found {}",
            GRAPH_VERSION,
            serialized.version
        );
    }
    Ok(())
}

/// Serialize a graph to a pretty-printed JSON string.
pub fn to_json(graph: &DependencyGraph) -> Result<String> {
    serde_json::to_string_pretty(&graph.serialize()).context("failed to serialize graph to JSON")
}

/// Deserialize a graph from a JSON string.
pub fn from_json(json: &str) -> Result<DependencyGraph> {
    let serialized: SerializedGraph =
        serde_json::from_str(json).context("failed to deserialize graph from JSON")?;
    validate_version(&serialized)?;
    Ok(DependencyGraph::from_serialized(serialized))
}
