//! The release pipeline: a fixed sequence of idempotent stages.
//!
//! Strictly sequential and blocking; each stage completes or fails before the
//! next begins, and the first failure stops the run with its captured
//! diagnostics. Working trees on local disk are the only shared resource and
//! the run assumes exclusive access to them.

use serde::Serialize;

use crate::artifact;
use crate::config::PipelineConfig;
use crate::deploy::{self, SizePartition};
use crate::error::{Error, Result};
use crate::executor::Executor;
use crate::log_status;
use crate::paths::RunPaths;
use crate::publish_branch::{self, PublishOutcome};
use crate::publisher;
use crate::run_log::RunLog;
use crate::sync::{self, SyncOutcome};

/// Per-repository synchronization report.
#[derive(Debug, Clone, Serialize)]
pub struct SyncReport {
    pub name: String,
    pub outcome: SyncOutcome,
}

/// Result of a completed run, exposed to the CLI for display.
#[derive(Debug, Clone, Serialize)]
pub struct RunOutcome {
    pub synced: Vec<SyncReport>,
    pub partition: SizePartition,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub published: Option<PublishOutcome>,
    pub run_log: String,
}

pub struct Pipeline {
    config: PipelineConfig,
}

impl Pipeline {
    pub fn new(config: PipelineConfig) -> Self {
        Self { config }
    }

    /// Run every stage to completion, stopping at the first failure.
    pub fn run(&self) -> Result<RunOutcome> {
        let config = &self.config;
        let paths = RunPaths::new(&config.work_dir, config.source_dir.as_deref());

        // Doomed runs fail before any clone or download starts.
        if config.push_changes
            && config.webroot_repo.starts_with("https://")
            && config.token.is_none()
        {
            return Err(Error::Precondition(format!(
                "Push to {} requires a credential; configure a token or disable push",
                config.webroot_repo
            )));
        }
        if config.source_dir.is_none() && config.source_repo.is_none() && !paths.source.exists() {
            return Err(Error::Precondition(
                "No IG source configured: set a source repo URL or a local source path"
                    .to_string(),
            ));
        }

        paths.ensure_run_dirs()?;
        let exec = Executor::new(RunLog::new(&paths.run_log));
        exec.log().note("pipeline run started")?;

        let synced = self.sync_repositories(&exec, &paths)?;

        log_status!("pipeline", "Ensuring publisher jar");
        artifact::ensure(&paths.publisher_jar, &config.publisher_url)?;

        publisher::build(&exec, &paths)?;
        publisher::publish(&exec, &paths)?;

        log_status!("pipeline", "Preparing deployment");
        let package = paths.source_package();
        let partition = deploy::prepare(
            &paths.webroot,
            &paths.deploy,
            &paths.release_assets,
            config.max_file_size_bytes,
            Some(&package),
        )?;

        let published = if config.push_changes {
            Some(publish_branch::publish_changes(
                &exec,
                &paths.webroot,
                &paths.deploy,
                &config.ig_folder,
                &config.webroot_repo,
                config.token.as_deref(),
                true,
            )?)
        } else {
            log_status!("pipeline", "Skipping push (push disabled)");
            None
        };

        exec.log().note("pipeline run completed")?;
        Ok(RunOutcome {
            synced,
            partition,
            published,
            run_log: paths.run_log.display().to_string(),
        })
    }

    /// Bring every configured working tree to a known state.
    /// Auxiliary trees that fail to update are kept stale and reported.
    fn sync_repositories(&self, exec: &Executor, paths: &RunPaths) -> Result<Vec<SyncReport>> {
        let config = &self.config;
        let mut reports = Vec::new();

        log_status!("pipeline", "Synchronizing repositories");
        reports.push(SyncReport {
            name: "history-template".to_string(),
            outcome: sync::sync(
                exec,
                &config.history_repo,
                &paths.history_template,
                config.history_branch.as_deref(),
                None,
            )?,
        });

        reports.push(SyncReport {
            name: "webroot".to_string(),
            outcome: sync::sync(
                exec,
                &config.webroot_repo,
                &paths.webroot,
                config.webroot_branch.as_deref(),
                config.webroot_sparse_paths(),
            )?,
        });

        reports.push(SyncReport {
            name: "ig-registry".to_string(),
            outcome: sync::sync(exec, &config.registry_repo, &paths.ig_registry, None, None)?,
        });

        // A local source checkout takes precedence over cloning.
        if config.source_dir.is_none() {
            if let Some(source_repo) = &config.source_repo {
                reports.push(SyncReport {
                    name: "source".to_string(),
                    outcome: sync::sync(
                        exec,
                        source_repo,
                        &paths.source,
                        config.source_branch.as_deref(),
                        None,
                    )?,
                });
            }
        }

        Ok(reports)
    }
}
