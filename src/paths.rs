use std::fs;
use std::path::{Path, PathBuf};

use crate::error::Result;

/// Directory layout for one publish run, rooted at the configured work dir.
#[derive(Debug, Clone)]
pub struct RunPaths {
    pub base: PathBuf,
    /// IG source working tree. Points at a user-supplied local checkout
    /// when one is configured, otherwise `<base>/source`.
    pub source: PathBuf,
    pub webroot: PathBuf,
    pub history_template: PathBuf,
    pub ig_registry: PathBuf,
    pub package_cache: PathBuf,
    pub temp: PathBuf,
    pub deploy: PathBuf,
    pub release_assets: PathBuf,
    pub publisher_jar: PathBuf,
    pub run_log: PathBuf,
}

impl RunPaths {
    pub fn new(base: &Path, source_override: Option<&Path>) -> Self {
        Self {
            base: base.to_path_buf(),
            source: source_override
                .map(Path::to_path_buf)
                .unwrap_or_else(|| base.join("source")),
            webroot: base.join("webroot"),
            history_template: base.join("history-template"),
            ig_registry: base.join("ig-registry"),
            package_cache: base.join("fhir-package-cache"),
            temp: base.join("temp"),
            deploy: base.join("deploy"),
            release_assets: base.join("release-assets"),
            publisher_jar: base.join("publisher.jar"),
            run_log: base.join("publish-run.log"),
        }
    }

    /// Registry list consumed by the publisher's `-registry` flag.
    pub fn registry_json(&self) -> PathBuf {
        self.ig_registry.join("fhir-ig-list.json")
    }

    /// Templates directory inside the webroot checkout.
    pub fn webroot_templates(&self) -> PathBuf {
        self.webroot.join("templates")
    }

    /// Packaged artifact produced by the build under the source tree.
    pub fn source_package(&self) -> PathBuf {
        self.source.join("output").join("package.tgz")
    }

    /// Create the directories the run writes into before any stage starts.
    /// Clone targets are left absent so the synchronizer sees them as new.
    pub fn ensure_run_dirs(&self) -> Result<()> {
        for dir in [&self.base, &self.package_cache, &self.temp] {
            if !dir.exists() {
                fs::create_dir_all(dir)?;
            }
        }
        Ok(())
    }
}
