//! Per-project cache of built graphs.
//!
//! Cached graphs are shared as `Arc<DependencyGraph>` and never mutated;
//! a rebuild swaps in a new graph wholesale.

use crate::builder::build_project_graph;
use anyhow::{Result, anyhow};
use codelink_core::config::ResolutionConfig;
use codelink_core::graph::DependencyGraph;
use codelink_core::store::RecordStore;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

#[derive(Debug, Default)]
pub struct GraphCache {
    graphs: RwLock<HashMap<String, Arc<DependencyGraph>>>,
}

impl GraphCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cached graph for a project, if one was built.
    pub fn get(&self, project_id: &str) -> Option<Arc<DependencyGraph>> {
        self.graphs
            .read()
            .ok()
            .and_then(|graphs| graphs.get(project_id).cloned())
    }

    /// Return the cached graph, building and caching it first if needed.
    pub fn get_or_build(
        &self,
        store: &dyn RecordStore,
        project_id: &str,
        config: &ResolutionConfig,
    ) -> Result<Arc<DependencyGraph>> {
        if let Some(graph) = self.get(project_id) {
            return Ok(graph);
        }
        self.rebuild(store, project_id, config)
    }

    /// Build a fresh graph from the store and replace any cached one.
    pub fn rebuild(
        &self,
        store: &dyn RecordStore,
        project_id: &str,
        config: &ResolutionConfig,
    ) -> Result<Arc<DependencyGraph>> {
        let graph = Arc::new(build_project_graph(store, project_id, config)?);
        let mut graphs = self
            .graphs
            .write()
            .map_err(|_| anyhow!("graph cache lock poisoned"))?;
        graphs.insert(project_id.to_string(), Arc::clone(&graph));
        Ok(graph)
    }

    /// Drop a project's cached graph. Returns whether one was cached.
    pub fn invalidate(&self, project_id: &str) -> bool {
        self.graphs
            .write()
            .map(|mut graphs| graphs.remove(project_id).is_some())
            .unwrap_or(false)
    }

    pub fn len(&self) -> usize {
        self.graphs.read().map(|g| g.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
