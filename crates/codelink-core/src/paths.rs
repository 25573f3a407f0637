//! Relative path normalization shared by the store, the extractor and the
//! graph builder. Graph node ids always use forward slashes.

use anyhow::{Context, Result};
use std::path::{Component, Path};

/// Replace platform separators with `/` and drop a leading `./`.
pub fn normalize(path: &str) -> String {
    let replaced = path.replace('\\', "/");
    let mut trimmed = replaced.as_str();
    while let Some(rest) = trimmed.strip_prefix("./") {
        trimmed = rest;
    }
    trimmed.to_string()
}

/// Normalized relative path of `path` under `root`. Relative inputs are
/// taken as already relative to the root.
pub fn relativize(root: &Path, path: &Path) -> Result<String> {
    let rel = if path.is_absolute() {
        match path.strip_prefix(root) {
            Ok(rel) => rel.to_path_buf(),
            // Symlinked roots (e.g. /tmp vs /private/tmp) only line up once canonical.
            Err(_) => {
                let canonical_root = root
                    .canonicalize()
                    .with_context(|| format!("failed to resolve {}", root.display()))?;
                let canonical_path = path
                    .canonicalize()
                    .with_context(|| format!("failed to resolve {}", path.display()))?;
                canonical_path
                    .strip_prefix(&canonical_root)
                    .with_context(|| {
                        format!("{} is not under {}", path.display(), root.display())
                    })?
                    .to_path_buf()
            }
        }
    } else {
        path.to_path_buf()
    };
    Ok(normalize(&rel.to_string_lossy()))
}

/// True when `path` is relative and stays inside its root (no `..`, no prefix).
pub fn is_contained(path: &str) -> bool {
    !path.is_empty()
        && Path::new(path)
            .components()
            .all(|c| matches!(c, Component::Normal(_) | Component::CurDir))
}
