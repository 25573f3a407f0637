//! Directed dependency multigraph over files and functions.
//!
//! Nodes are keyed by id: a file node's id is its normalized relative path, a
//! function node's id is `<relative_path>::<full_name>`. Edges carry a kind;
//! two nodes may be linked by several edges of different kinds, but an
//! identical (source, target, kind) edge is stored once.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::fmt;

/// Schema version written into serialized graphs.
pub const GRAPH_VERSION: &str = "1.0.0";

/// Separator between the file path and the qualified name in function ids.
pub const ID_SEPARATOR: &str = "::";

/// A graph node: a source file or a function/method declared in one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Node {
    File {
        id: String,
        label: String,
    },
    Function {
        id: String,
        label: String,
        file_path: String,
        line: usize,
    },
}

impl Node {
    /// File node for a normalized relative path. The label is the basename.
    pub fn file(path: &str) -> Self {
        let label = path.rsplit('/').next().unwrap_or(path).to_string();
        Node::File {
            id: path.to_string(),
            label,
        }
    }

    /// Function node for `full_name` declared in `file_path`.
    pub fn function(file_path: &str, full_name: &str, line: usize) -> Self {
        let label = full_name.rsplit('.').next().unwrap_or(full_name).to_string();
        Node::Function {
            id: function_id(file_path, full_name),
            label,
            file_path: file_path.to_string(),
            line,
        }
    }

    pub fn id(&self) -> &str {
        match self {
            Node::File { id, .. } | Node::Function { id, .. } => id,
        }
    }

    pub fn label(&self) -> &str {
        match self {
            Node::File { label, .. } | Node::Function { label, .. } => label,
        }
    }

    pub fn is_file(&self) -> bool {
        matches!(self, Node::File { .. })
    }

    pub fn is_function(&self) -> bool {
        matches!(self, Node::Function { .. })
    }
}

/// Build the unique id of a function node.
pub fn function_id(file_path: &str, full_name: &str) -> String {
    format!("{}{}{}", file_path, ID_SEPARATOR, full_name)
}

/// The kind of relationship an edge represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EdgeKind {
    /// File declares the function.
    Contains,
    /// File imports another analyzed file.
    Imports,
    /// Function calls a uniquely resolved function.
    Calls,
    /// Function calls one of several equally named functions.
    CallsAmbiguous,
}

impl EdgeKind {
    pub fn as_str(self) -> &'static str {
        match self {
            EdgeKind::Contains => "contains",
            EdgeKind::Imports => "imports",
            EdgeKind::Calls => "calls",
            EdgeKind::CallsAmbiguous => "calls_ambiguous",
        }
    }
}

impl fmt::Display for EdgeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A directed, typed edge.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Edge {
    pub source: String,
    pub target: String,
    pub kind: EdgeKind,
}

/// Aggregate statistics for a built graph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphMetadata {
    pub built_at: DateTime<Utc>,
    pub total_files: usize,
    pub total_functions: usize,
    pub total_edges: usize,
    pub contains_edges: usize,
    pub import_edges: usize,
    pub call_edges: usize,
    pub ambiguous_call_edges: usize,
}

impl Default for GraphMetadata {
    fn default() -> Self {
        Self {
            built_at: Utc::now(),
            total_files: 0,
            total_functions: 0,
            total_edges: 0,
            contains_edges: 0,
            import_edges: 0,
            call_edges: 0,
            ambiguous_call_edges: 0,
        }
    }
}

/// Full structural dump of a graph, sufficient to reconstruct it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SerializedGraph {
    pub version: String,
    pub metadata: GraphMetadata,
    pub nodes: Vec<Node>,
    pub edges: Vec<Edge>,
}

/// A node together with its direct predecessors and successors.
#[derive(Debug, Clone, Serialize)]
pub struct NodeNeighborhood {
    pub node: Node,
    pub callers: Vec<Node>,
    pub callees: Vec<Node>,
}

/// In-memory dependency graph keyed by node id.
#[derive(Debug, Clone, Default)]
pub struct DependencyGraph {
    metadata: GraphMetadata,
    nodes: BTreeMap<String, Node>,
    edges: Vec<Edge>,
    /// node id -> indices into `edges` where the node is the source.
    outgoing: HashMap<String, Vec<usize>>,
    /// node id -> indices into `edges` where the node is the target.
    incoming: HashMap<String, Vec<usize>>,
}

impl DependencyGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a node. Returns false (and leaves the stored node untouched) if
    /// a node with the same id already exists.
    pub fn add_node(&mut self, node: Node) -> bool {
        if self.nodes.contains_key(node.id()) {
            return false;
        }
        self.nodes.insert(node.id().to_string(), node);
        true
    }

    /// Insert a file node and return its id.
    pub fn add_file(&mut self, path: &str) -> String {
        let node = Node::file(path);
        let id = node.id().to_string();
        self.add_node(node);
        id
    }

    /// Insert a function node and return its id.
    pub fn add_function(&mut self, file_path: &str, full_name: &str, line: usize) -> String {
        let node = Node::function(file_path, full_name, line);
        let id = node.id().to_string();
        self.add_node(node);
        id
    }

    /// Insert an edge. Returns false when an identical edge already exists or
    /// either endpoint is not a node of this graph.
    pub fn add_edge(&mut self, source: &str, target: &str, kind: EdgeKind) -> bool {
        if !self.nodes.contains_key(source) || !self.nodes.contains_key(target) {
            tracing::debug!("dropping {} edge with unknown endpoint: {} -> {}", kind, source, target);
            return false;
        }
        if self.has_edge(source, target, kind) {
            return false;
        }
        let index = self.edges.len();
        self.edges.push(Edge {
            source: source.to_string(),
            target: target.to_string(),
            kind,
        });
        self.outgoing
            .entry(source.to_string())
            .or_default()
            .push(index);
        self.incoming
            .entry(target.to_string())
            .or_default()
            .push(index);
        true
    }

    pub fn has_edge(&self, source: &str, target: &str, kind: EdgeKind) -> bool {
        self.outgoing.get(source).is_some_and(|indices| {
            indices
                .iter()
                .any(|&i| self.edges[i].target == target && self.edges[i].kind == kind)
        })
    }

    pub fn get_node(&self, id: &str) -> Option<&Node> {
        self.nodes.get(id)
    }

    pub fn contains_node(&self, id: &str) -> bool {
        self.nodes.contains_key(id)
    }

    /// Distinct nodes with an edge of any kind pointing into `id`.
    /// Empty when `id` is not in the graph.
    pub fn get_callers(&self, id: &str) -> Vec<&Node> {
        self.neighbors(self.incoming.get(id), |e| &e.source)
    }

    /// Distinct nodes with an edge of any kind pointing out of `id`.
    /// Empty when `id` is not in the graph.
    pub fn get_callees(&self, id: &str) -> Vec<&Node> {
        self.neighbors(self.outgoing.get(id), |e| &e.target)
    }

    fn neighbors<'a>(
        &'a self,
        indices: Option<&'a Vec<usize>>,
        endpoint: impl Fn(&'a Edge) -> &'a String,
    ) -> Vec<&'a Node> {
        let Some(indices) = indices else {
            return Vec::new();
        };
        let mut seen = HashSet::new();
        indices
            .iter()
            .map(|&i| endpoint(&self.edges[i]))
            .filter(|id| seen.insert(id.as_str()))
            .filter_map(|id| self.nodes.get(id))
            .collect()
    }

    /// Edges whose source is `id`, in insertion order.
    pub fn edges_from(&self, id: &str) -> Vec<&Edge> {
        self.outgoing
            .get(id)
            .map(|indices| indices.iter().map(|&i| &self.edges[i]).collect())
            .unwrap_or_default()
    }

    /// Edges whose target is `id`, in insertion order.
    pub fn edges_to(&self, id: &str) -> Vec<&Edge> {
        self.incoming
            .get(id)
            .map(|indices| indices.iter().map(|&i| &self.edges[i]).collect())
            .unwrap_or_default()
    }

    /// Node plus callers and callees; `None` if the node does not exist.
    pub fn neighborhood(&self, id: &str) -> Option<NodeNeighborhood> {
        let node = self.get_node(id)?;
        Some(NodeNeighborhood {
            node: node.clone(),
            callers: self.get_callers(id).into_iter().cloned().collect(),
            callees: self.get_callees(id).into_iter().cloned().collect(),
        })
    }

    /// All nodes in id order.
    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.nodes.values()
    }

    /// File nodes in id order.
    pub fn file_nodes(&self) -> impl Iterator<Item = &Node> {
        self.nodes.values().filter(|n| n.is_file())
    }

    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn metadata(&self) -> &GraphMetadata {
        &self.metadata
    }

    /// Recompute metadata counts from the current nodes and edges.
    pub fn refresh_metadata(&mut self) {
        let count_kind = |kind: EdgeKind| self.edges.iter().filter(|e| e.kind == kind).count();
        let metadata = GraphMetadata {
            built_at: Utc::now(),
            total_files: self.nodes.values().filter(|n| n.is_file()).count(),
            total_functions: self.nodes.values().filter(|n| n.is_function()).count(),
            total_edges: self.edges.len(),
            contains_edges: count_kind(EdgeKind::Contains),
            import_edges: count_kind(EdgeKind::Imports),
            call_edges: count_kind(EdgeKind::Calls),
            ambiguous_call_edges: count_kind(EdgeKind::CallsAmbiguous),
        };
        self.metadata = metadata;
    }

    /// Dump nodes (id order) and edges (insertion order).
    pub fn serialize(&self) -> SerializedGraph {
        SerializedGraph {
            version: GRAPH_VERSION.to_string(),
            metadata: self.metadata.clone(),
            nodes: self.nodes.values().cloned().collect(),
            edges: self.edges.clone(),
        }
    }

    /// Rebuild a graph from its serialized form. Duplicate nodes and edges
    /// collapse; edges referencing unknown nodes are dropped.
    pub fn from_serialized(serialized: SerializedGraph) -> Self {
        let mut graph = Self::new();
        for node in serialized.nodes {
            graph.add_node(node);
        }
        for edge in serialized.edges {
            if !graph.add_edge(&edge.source, &edge.target, edge.kind)
                && !graph.has_edge(&edge.source, &edge.target, edge.kind)
            {
                tracing::warn!(
                    "skipping dangling {} edge {} -> {}",
                    edge.kind,
                    edge.source,
                    edge.target
                );
            }
        }
        graph.metadata = serialized.metadata;
        graph
    }
}
