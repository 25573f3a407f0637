//! Persistence of per-file source records, keyed by project and relative path.
//!
//! The graph builder only needs [`RecordStore::load_all`]; the parse step
//! writes through [`RecordStore::store`]. Relative paths are normalized to
//! forward slashes on the way in and on the way out.

use crate::paths;
use crate::record::SourceRecord;
use anyhow::{Context, Result};
use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::RwLock;

const RECORD_SUFFIX: &str = ".json";

/// Invalid store keys.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("invalid project id: {0:?}")]
    InvalidProjectId(String),
    #[error("invalid relative path: {0:?}")]
    InvalidPath(String),
}

/// Key -> record mapping for one or more projects.
pub trait RecordStore: Send + Sync {
    fn store(&self, project_id: &str, relative_path: &str, record: &SourceRecord) -> Result<()>;

    /// `None` when no record exists for the path.
    fn load(&self, project_id: &str, relative_path: &str) -> Result<Option<SourceRecord>>;

    /// All records of a project, sorted by relative path. An unknown project
    /// yields an empty list.
    fn load_all(&self, project_id: &str) -> Result<Vec<(String, SourceRecord)>>;

    /// Drop every record of a project.
    fn clear(&self, project_id: &str) -> Result<()>;
}

pub(crate) fn check_project_id(project_id: &str) -> Result<(), StoreError> {
    if project_id.is_empty()
        || project_id == "."
        || project_id == ".."
        || project_id.contains(['/', '\\'])
    {
        return Err(StoreError::InvalidProjectId(project_id.to_string()));
    }
    Ok(())
}

fn check_relative_path(relative_path: &str) -> Result<String, StoreError> {
    let normalized = paths::normalize(relative_path);
    if !paths::is_contained(&normalized) {
        return Err(StoreError::InvalidPath(relative_path.to_string()));
    }
    Ok(normalized)
}

// ---------------------------------------------------------------------------
// JSON files on disk
// ---------------------------------------------------------------------------

/// One pretty-printed JSON file per source file:
/// `<root>/<project_id>/<relative_path>.json`.
#[derive(Debug, Clone)]
pub struct JsonRecordStore {
    root: PathBuf,
}

impl JsonRecordStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Directory holding a project's records.
    pub fn project_dir(&self, project_id: &str) -> Result<PathBuf> {
        check_project_id(project_id)?;
        Ok(self.root.join(project_id))
    }

    fn record_file(&self, project_id: &str, relative_path: &str) -> Result<PathBuf> {
        let rel = check_relative_path(relative_path)?;
        Ok(self
            .project_dir(project_id)?
            .join(format!("{}{}", rel, RECORD_SUFFIX)))
    }
}

impl RecordStore for JsonRecordStore {
    fn store(&self, project_id: &str, relative_path: &str, record: &SourceRecord) -> Result<()> {
        let path = self.record_file(project_id, relative_path)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("failed to create {}", parent.display()))?;
        }
        let json = serde_json::to_string_pretty(record).context("failed to serialize record")?;
        fs::write(&path, json).with_context(|| format!("failed to write {}", path.display()))?;
        Ok(())
    }

    fn load(&self, project_id: &str, relative_path: &str) -> Result<Option<SourceRecord>> {
        let path = self.record_file(project_id, relative_path)?;
        if !path.exists() {
            return Ok(None);
        }
        let json = fs::read_to_string(&path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        let record = serde_json::from_str(&json)
            .with_context(|| format!("failed to parse record {}", path.display()))?;
        Ok(Some(record))
    }

    fn load_all(&self, project_id: &str) -> Result<Vec<(String, SourceRecord)>> {
        let dir = self.project_dir(project_id)?;
        if !dir.is_dir() {
            return Ok(Vec::new());
        }

        let mut records = Vec::new();
        for entry in walkdir::WalkDir::new(&dir).sort_by_file_name() {
            let entry =
                entry.with_context(|| format!("failed to walk records in {}", dir.display()))?;
            if !entry.file_type().is_file() {
                continue;
            }
            let path = entry.path();
            let Ok(rel) = path.strip_prefix(&dir) else {
                continue;
            };
            let rel = paths::normalize(&rel.to_string_lossy());
            let Some(source_path) = rel.strip_suffix(RECORD_SUFFIX) else {
                continue;
            };
            let json = fs::read_to_string(path)
                .with_context(|| format!("failed to read {}", path.display()))?;
            match serde_json::from_str::<SourceRecord>(&json) {
                Ok(record) => records.push((source_path.to_string(), record)),
                Err(e) => tracing::warn!("skipping unreadable record {}: {}", path.display(), e),
            }
        }
        records.sort_by(|a, b| a.0.cmp(&b.0));
        Ok(records)
    }

    fn clear(&self, project_id: &str) -> Result<()> {
        let dir = self.project_dir(project_id)?;
        if dir.exists() {
            fs::remove_dir_all(&dir)
                .with_context(|| format!("failed to clear records in {}", dir.display()))?;
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// In-process map
// ---------------------------------------------------------------------------

/// Records held in memory; useful for embedding and tests.
#[derive(Debug, Default)]
pub struct MemoryRecordStore {
    projects: RwLock<HashMap<String, BTreeMap<String, SourceRecord>>>,
}

impl MemoryRecordStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl RecordStore for MemoryRecordStore {
    fn store(&self, project_id: &str, relative_path: &str, record: &SourceRecord) -> Result<()> {
        check_project_id(project_id)?;
        let rel = check_relative_path(relative_path)?;
        let mut projects = self
            .projects
            .write()
            .map_err(|_| anyhow::anyhow!("record store lock poisoned"))?;
        projects
            .entry(project_id.to_string())
            .or_default()
            .insert(rel, record.clone());
        Ok(())
    }

    fn load(&self, project_id: &str, relative_path: &str) -> Result<Option<SourceRecord>> {
        check_project_id(project_id)?;
        let rel = check_relative_path(relative_path)?;
        let projects = self
            .projects
            .read()
            .map_err(|_| anyhow::anyhow!("record store lock poisoned"))?;
        Ok(projects
            .get(project_id)
            .and_then(|records| records.get(&rel))
            .cloned())
    }

    fn load_all(&self, project_id: &str) -> Result<Vec<(String, SourceRecord)>> {
        check_project_id(project_id)?;
        let projects = self
            .projects
            .read()
            .map_err(|_| anyhow::anyhow!("record store lock poisoned"))?;
        Ok(projects
            .get(project_id)
            .map(|records| {
                records
                    .iter()
                    .map(|(path, record)| (path.clone(), record.clone()))
                    .collect()
            })
            .unwrap_or_default())
    }

    fn clear(&self, project_id: &str) -> Result<()> {
        check_project_id(project_id)?;
        let mut projects = self
            .projects
            .write()
            .map_err(|_| anyhow::anyhow!("record store lock poisoned"))?;
        projects.remove(project_id);
        Ok(())
    }
}
