//! Whole-project parsing: collect source files, extract each one, store the
//! resulting records.

use crate::extract::extract_or_failed;
use crate::languages::Language;
use anyhow::{Context, Result};
use codelink_core::config::ExtractionConfig;
use codelink_core::paths;
use codelink_core::record::SourceRecord;
use codelink_core::store::RecordStore;
use globset::{Glob, GlobSet, GlobSetBuilder};
use rayon::prelude::*;
use serde::Serialize;
use std::path::Path;

/// A source file's content keyed by its normalized project-relative path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceFile {
    pub rel_path: String,
    pub content: String,
}

/// Outcome of parsing a project.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ParseSummary {
    /// Files extracted without error.
    pub parsed_files: usize,
    /// Files stored as error-tagged records.
    pub failed_files: usize,
    /// `(relative_path, message)` for every failed file.
    pub failures: Vec<(String, String)>,
}

impl ParseSummary {
    pub fn total_files(&self) -> usize {
        self.parsed_files + self.failed_files
    }
}

fn build_globset(patterns: &[String], what: &str) -> Result<Option<GlobSet>> {
    if patterns.is_empty() {
        return Ok(None);
    }
    let mut builder = GlobSetBuilder::new();
    for p in patterns {
        builder.add(Glob::new(p).with_context(|| format!("invalid {} glob: {}", what, p))?);
    }
    let set = builder
        .build()
        .with_context(|| format!("invalid {} glob set", what))?;
    Ok(Some(set))
}

/// Collect analyzable source files under `project_root`, sorted by relative path.
///
/// A file is collected when its extension is configured and maps to a
/// [`Language`] the extractor understands. Hidden entries are skipped.
/// Content is decoded lossily, so a file with invalid UTF-8 is still collected.
pub fn collect_source_files(
    project_root: &Path,
    config: &ExtractionConfig,
) -> Result<Vec<SourceFile>> {
    let include_set = build_globset(&config.include, "include")?;
    let exclude_set = build_globset(&config.exclude, "exclude")?;
    for ext in &config.extensions {
        if Language::from_extension(ext).is_none() {
            tracing::warn!("no extractor for .{} files; they are skipped", ext);
        }
    }

    let walker = ignore::WalkBuilder::new(project_root)
        .hidden(true)
        .git_ignore(config.respect_gitignore)
        .git_exclude(config.respect_gitignore)
        .ignore(config.respect_gitignore)
        .require_git(false)
        .add_custom_ignore_filename(".codelinkignore")
        .build();

    let mut files = Vec::new();
    for entry in walker.flatten() {
        let path = entry.path();
        if !path.is_file() {
            continue;
        }
        let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");
        if Language::from_extension(ext).is_none()
            || !config
                .extensions
                .iter()
                .any(|e| e.eq_ignore_ascii_case(ext))
        {
            continue;
        }
        let rel = path.strip_prefix(project_root).unwrap_or(path);
        if let Some(ref inc) = include_set
            && !inc.is_match(rel)
        {
            continue;
        }
        if let Some(ref exc) = exclude_set
            && exc.is_match(rel)
        {
            continue;
        }

        match std::fs::read(path) {
            Ok(bytes) => files.push(SourceFile {
                rel_path: paths::normalize(&rel.to_string_lossy()),
                content: String::from_utf8_lossy(&bytes).into_owned(),
            }),
            Err(e) => tracing::warn!("skipping unreadable file {}: {}", path.display(), e),
        }
    }

    files.sort_by(|a, b| a.rel_path.cmp(&b.rel_path));
    tracing::debug!(
        "collected {} source files under {}",
        files.len(),
        project_root.display()
    );
    Ok(files)
}

/// Replace a project's records with fresh extractions of `files`.
///
/// Every file gets a record; files that fail to parse are stored as
/// error-tagged records and listed in the summary.
pub fn parse_sources(
    project_id: &str,
    files: &[SourceFile],
    store: &dyn RecordStore,
) -> Result<ParseSummary> {
    store
        .clear(project_id)
        .with_context(|| format!("failed to clear records of project {}", project_id))?;

    let records: Vec<(&str, SourceRecord)> = files
        .par_iter()
        .map(|f| (f.rel_path.as_str(), extract_or_failed(&f.rel_path, &f.content)))
        .collect();

    let mut summary = ParseSummary::default();
    for (rel_path, record) in records {
        store.store(project_id, rel_path, &record)?;
        match &record.error {
            Some(message) => {
                tracing::warn!("{}: {}", rel_path, message);
                summary.failed_files += 1;
                summary.failures.push((rel_path.to_string(), message.clone()));
            }
            None => summary.parsed_files += 1,
        }
    }

    tracing::info!(
        "parsed {} files for project {} ({} failed)",
        summary.parsed_files,
        project_id,
        summary.failed_files
    );
    Ok(summary)
}

/// Collect and parse every source file of a project.
pub fn parse_project(
    project_root: &Path,
    project_id: &str,
    store: &dyn RecordStore,
    config: &ExtractionConfig,
) -> Result<ParseSummary> {
    let files = collect_source_files(project_root, config)?;
    parse_sources(project_id, &files, store)
}

/// Stored record for one file. `path` may be relative to the project root or
/// an absolute path under it.
pub fn get_file_record(
    store: &dyn RecordStore,
    project_id: &str,
    project_root: &Path,
    path: &str,
) -> Result<Option<SourceRecord>> {
    let rel = paths::relativize(project_root, Path::new(path))?;
    store.load(project_id, &rel)
}
