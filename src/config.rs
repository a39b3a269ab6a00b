//! Pipeline configuration.
//!
//! The core pipeline receives one immutable [`PipelineConfig`] value built by
//! the caller; it performs no ambient config or environment lookups itself.
//! The CLI layer merges built-in defaults, the persisted YAML file, and
//! command-line overrides, in that order.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::Result;

pub const CONFIG_FILE_NAME: &str = "release-config.yaml";

pub const DEFAULT_WEBROOT_REPO: &str = "https://github.com/WorldHealthOrganization/smart-html";
pub const DEFAULT_HISTORY_REPO: &str = "https://github.com/HL7/fhir-ig-history-template";
pub const DEFAULT_REGISTRY_REPO: &str = "https://github.com/FHIR/ig-registry";
pub const DEFAULT_PUBLISHER_URL: &str =
    "https://github.com/HL7/fhir-ig-publisher/releases/latest/download/publisher.jar";
pub const DEFAULT_IG_FOLDER: &str = "hiv";
pub const DEFAULT_MAX_FILE_SIZE_MB: u64 = 100;

/// Immutable configuration for one pipeline run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Local IG source checkout. When set, the source repo is not cloned.
    pub source_dir: Option<PathBuf>,
    pub source_repo: Option<String>,
    pub source_branch: Option<String>,
    pub webroot_repo: String,
    pub webroot_branch: Option<String>,
    pub history_repo: String,
    pub history_branch: Option<String>,
    pub registry_repo: String,
    pub publisher_url: String,
    /// Sub-path of the webroot that this IG publishes into.
    pub ig_folder: String,
    /// Top-level webroot paths materialized when sparse fetch is enabled.
    pub sparse_dirs: Vec<String>,
    pub enable_sparse: bool,
    pub max_file_size_bytes: u64,
    pub push_changes: bool,
    /// Credential substituted into the HTTPS remote URL for push.
    pub token: Option<String>,
    pub work_dir: PathBuf,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            source_dir: None,
            source_repo: None,
            source_branch: None,
            webroot_repo: DEFAULT_WEBROOT_REPO.to_string(),
            webroot_branch: None,
            history_repo: DEFAULT_HISTORY_REPO.to_string(),
            history_branch: None,
            registry_repo: DEFAULT_REGISTRY_REPO.to_string(),
            publisher_url: DEFAULT_PUBLISHER_URL.to_string(),
            ig_folder: DEFAULT_IG_FOLDER.to_string(),
            sparse_dirs: vec!["templates".to_string(), "assets".to_string()],
            enable_sparse: false,
            max_file_size_bytes: DEFAULT_MAX_FILE_SIZE_MB * 1024 * 1024,
            push_changes: false,
            token: None,
            work_dir: PathBuf::from("."),
        }
    }
}

impl PipelineConfig {
    /// Sparse path set for the webroot sync, or None when disabled.
    pub fn webroot_sparse_paths(&self) -> Option<&[String]> {
        if self.enable_sparse && !self.sparse_dirs.is_empty() {
            Some(&self.sparse_dirs)
        } else {
            None
        }
    }
}

/// Subset of the configuration persisted in `release-config.yaml`.
/// Every field is optional; absent fields keep their defaults.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SavedConfig {
    pub source_dir: Option<String>,
    pub source_repo: Option<String>,
    pub source_branch: Option<String>,
    pub webroot_repo: Option<String>,
    pub webroot_branch: Option<String>,
    pub history_repo: Option<String>,
    pub history_branch: Option<String>,
    pub registry_repo: Option<String>,
    pub enable_sparse_checkout: Option<bool>,
    pub sparse_dirs: Option<Vec<String>>,
    pub max_file_size_mb: Option<u64>,
}

impl SavedConfig {
    /// Load the persisted config, returning defaults when the file is absent.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let raw = fs::read_to_string(path)?;
        Ok(serde_yml::from_str(&raw)?)
    }

    /// Persist atomically: write a temp file, then rename.
    pub fn save(&self, path: &Path) -> Result<()> {
        let raw = serde_yml::to_string(self)?;
        let tmp = path.with_extension("yaml.tmp");
        fs::write(&tmp, raw)?;
        fs::rename(&tmp, path)?;
        Ok(())
    }

    /// Apply persisted values over `config`. CLI overrides are applied after
    /// this, so precedence is defaults < file < flags.
    pub fn apply_to(&self, config: &mut PipelineConfig) {
        if let Some(v) = &self.source_dir {
            config.source_dir = Some(PathBuf::from(v));
        }
        if let Some(v) = &self.source_repo {
            config.source_repo = Some(v.clone());
        }
        if let Some(v) = &self.source_branch {
            config.source_branch = Some(v.clone());
        }
        if let Some(v) = &self.webroot_repo {
            config.webroot_repo = v.clone();
        }
        if let Some(v) = &self.webroot_branch {
            config.webroot_branch = Some(v.clone());
        }
        if let Some(v) = &self.history_repo {
            config.history_repo = v.clone();
        }
        if let Some(v) = &self.history_branch {
            config.history_branch = Some(v.clone());
        }
        if let Some(v) = &self.registry_repo {
            config.registry_repo = v.clone();
        }
        if let Some(v) = self.enable_sparse_checkout {
            config.enable_sparse = v;
        }
        if let Some(v) = &self.sparse_dirs {
            config.sparse_dirs = v.clone();
        }
        if let Some(v) = self.max_file_size_mb {
            config.max_file_size_bytes = v * 1024 * 1024;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_the_published_endpoints() {
        let config = PipelineConfig::default();
        assert_eq!(config.webroot_repo, DEFAULT_WEBROOT_REPO);
        assert_eq!(config.registry_repo, DEFAULT_REGISTRY_REPO);
        assert_eq!(config.max_file_size_bytes, 100 * 1024 * 1024);
        assert!(!config.push_changes);
        assert!(config.webroot_sparse_paths().is_none());
    }

    #[test]
    fn sparse_paths_require_enable_flag_and_non_empty_list() {
        let mut config = PipelineConfig::default();
        config.enable_sparse = true;
        assert_eq!(config.webroot_sparse_paths().unwrap().len(), 2);

        config.sparse_dirs.clear();
        assert!(config.webroot_sparse_paths().is_none());
    }

    #[test]
    fn saved_config_round_trips_and_merges() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE_NAME);

        let saved = SavedConfig {
            webroot_repo: Some("https://example.org/webroot".to_string()),
            enable_sparse_checkout: Some(true),
            max_file_size_mb: Some(50),
            ..Default::default()
        };
        saved.save(&path).unwrap();

        let loaded = SavedConfig::load(&path).unwrap();
        let mut config = PipelineConfig::default();
        loaded.apply_to(&mut config);

        assert_eq!(config.webroot_repo, "https://example.org/webroot");
        assert!(config.enable_sparse);
        assert_eq!(config.max_file_size_bytes, 50 * 1024 * 1024);
        // Untouched fields keep their defaults.
        assert_eq!(config.history_repo, DEFAULT_HISTORY_REPO);
    }

    #[test]
    fn missing_file_loads_as_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let loaded = SavedConfig::load(&dir.path().join("absent.yaml")).unwrap();
        assert!(loaded.webroot_repo.is_none());
    }
}
