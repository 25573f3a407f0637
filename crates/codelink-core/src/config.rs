//! Configuration for extraction, resolution and storage.
//!
//! Load order: `.codelink/config.toml` → environment variables → defaults.

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::str::FromStr;

/// Top-level codelink configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CodelinkConfig {
    pub extraction: ExtractionConfig,
    pub resolution: ResolutionConfig,
    pub storage: StorageConfig,
}

/// Which files are analyzable.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractionConfig {
    /// File extensions to extract, without the leading dot.
    pub extensions: Vec<String>,
    /// Glob patterns a relative path must match (empty = all).
    pub include: Vec<String>,
    /// Glob patterns that exclude a relative path.
    pub exclude: Vec<String>,
    /// Skip files ignored by `.gitignore` and friends.
    pub respect_gitignore: bool,
}

/// Graph building configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResolutionConfig {
    /// Extension appended when mapping an import module to a file path.
    pub module_extension: String,
    /// What to do with a call whose name matches several functions.
    pub ambiguity: AmbiguityPolicy,
}

/// Storage locations.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Directory holding per-file records, relative to the project root
    /// unless absolute.
    pub records_dir: String,
}

/// Policy for call sites whose bare name matches more than one function.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AmbiguityPolicy {
    /// Link every candidate with a `calls_ambiguous` edge.
    #[default]
    LinkAll,
    /// Emit no edge for an ambiguous call.
    Skip,
}

impl FromStr for AmbiguityPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "link_all" | "link-all" | "all" => Ok(AmbiguityPolicy::LinkAll),
            "skip" | "none" => Ok(AmbiguityPolicy::Skip),
            other => Err(format!("unknown ambiguity policy: {}", other)),
        }
    }
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            extensions: vec!["py".to_string()],
            include: Vec::new(),
            exclude: Vec::new(),
            respect_gitignore: true,
        }
    }
}

impl Default for ResolutionConfig {
    fn default() -> Self {
        Self {
            module_extension: "py".to_string(),
            ambiguity: AmbiguityPolicy::LinkAll,
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            records_dir: ".codelink/records".to_string(),
        }
    }
}

impl StorageConfig {
    /// Absolute records directory for a project root.
    pub fn records_root(&self, project_root: &Path) -> std::path::PathBuf {
        let dir = Path::new(&self.records_dir);
        if dir.is_absolute() {
            dir.to_path_buf()
        } else {
            project_root.join(dir)
        }
    }
}

/// Helper to parse an env var and apply it to a config field.
fn env_override<T: FromStr>(var: &str, target: &mut T) {
    if let Ok(v) = std::env::var(var)
        && let Ok(n) = v.parse()
    {
        *target = n;
    }
}

impl CodelinkConfig {
    /// Load config from `.codelink/config.toml` in the project root, with env
    /// var overrides. Falls back to defaults if no config file exists.
    pub fn load(project_root: &Path) -> Result<Self> {
        let config_path = project_root.join(".codelink").join("config.toml");

        let mut config = if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            toml::from_str(&content)?
        } else {
            Self::default()
        };

        env_override(
            "CODELINK_MODULE_EXTENSION",
            &mut config.resolution.module_extension,
        );
        env_override("CODELINK_AMBIGUITY", &mut config.resolution.ambiguity);
        env_override("CODELINK_RECORDS_DIR", &mut config.storage.records_dir);
        env_override(
            "CODELINK_RESPECT_GITIGNORE",
            &mut config.extraction.respect_gitignore,
        );

        config.normalize();
        config.validate()?;
        Ok(config)
    }

    /// Strip leading dots so `.py` and `py` mean the same extension.
    fn normalize(&mut self) {
        for ext in &mut self.extraction.extensions {
            *ext = ext.trim_start_matches('.').to_ascii_lowercase();
        }
        self.extraction.extensions.retain(|e| !e.is_empty());
        self.resolution.module_extension = self
            .resolution
            .module_extension
            .trim_start_matches('.')
            .to_string();
    }

    pub fn validate(&self) -> Result<()> {
        if self.extraction.extensions.is_empty() {
            anyhow::bail!("extraction.extensions must list at least one file extension");
        }
        if self.resolution.module_extension.is_empty() {
            anyhow::bail!("resolution.module_extension must not be empty");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = CodelinkConfig::default();
        assert_eq!(config.extraction.extensions, vec!["py".to_string()]);
        assert!(config.extraction.respect_gitignore);
        assert_eq!(config.resolution.module_extension, "py");
        assert_eq!(config.resolution.ambiguity, AmbiguityPolicy::LinkAll);
        assert_eq!(config.storage.records_dir, ".codelink/records");
    }

    #[test]
    fn test_config_from_toml() {
        let toml_str = r#"
[extraction]
extensions = ["py", "pyi"]
exclude = ["tests/**"]

[resolution]
ambiguity = "skip"
"#;
        let config: CodelinkConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.extraction.extensions.len(), 2);
        assert_eq!(config.extraction.exclude, vec!["tests/**".to_string()]);
        assert_eq!(config.resolution.ambiguity, AmbiguityPolicy::Skip);
        // Defaults for unspecified fields
        assert_eq!(config.resolution.module_extension, "py");
        assert!(config.extraction.respect_gitignore);
    }

    #[test]
    fn test_config_load_nonexistent() {
        let config = CodelinkConfig::load(Path::new("/nonexistent/path")).unwrap();
        assert_eq!(config.extraction.extensions, vec!["py".to_string()]);
    }

    #[test]
    fn test_load_normalizes_extensions() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = tmp.path().join(".codelink");
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(
            dir.join("config.toml"),
            r#"
[extraction]
extensions = [".PY"]

[resolution]
module_extension = ".py"
"#,
        )
        .unwrap();

        let config = CodelinkConfig::load(tmp.path()).unwrap();
        assert_eq!(config.extraction.extensions, vec!["py".to_string()]);
        assert_eq!(config.resolution.module_extension, "py");
    }

    #[test]
    fn test_load_rejects_empty_extensions() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = tmp.path().join(".codelink");
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join("config.toml"), "[extraction]\nextensions = []\n").unwrap();

        assert!(CodelinkConfig::load(tmp.path()).is_err());
    }

    #[test]
    fn test_ambiguity_policy_from_str() {
        assert_eq!(
            "link_all".parse::<AmbiguityPolicy>(),
            Ok(AmbiguityPolicy::LinkAll)
        );
        assert_eq!("Skip".parse::<AmbiguityPolicy>(), Ok(AmbiguityPolicy::Skip));
        assert!("maybe".parse::<AmbiguityPolicy>().is_err());
    }

    #[test]
    fn test_records_root_relative_and_absolute() {
        let storage = StorageConfig::default();
        let root = Path::new("/work/proj");
        assert_eq!(
            storage.records_root(root),
            Path::new("/work/proj/.codelink/records")
        );

        let abs = StorageConfig {
            records_dir: "/var/codelink".to_string(),
        };
        assert_eq!(abs.records_root(root), Path::new("/var/codelink"));
    }
}
