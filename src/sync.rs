//! Repository synchronization: bring a local working tree to a known state.
//!
//! Missing paths are shallow-cloned; existing paths are hard-reset and
//! pulled. Update failures on an existing tree are recoverable: the stale
//! checkout is kept and the pipeline moves on with possibly-stale auxiliary
//! data rather than hard-failing the whole run.

use std::path::Path;

use serde::Serialize;

use crate::error::Result;
use crate::executor::{ExecOptions, Executor};
use crate::log_status;

/// Outcome of one synchronization call.
///
/// `StaleKept` is a success from the pipeline's point of view: the existing
/// checkout could not be updated but remains usable.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncOutcome {
    Cloned,
    Updated,
    StaleKept { warning: String },
}

/// Synchronize `local` with `remote`.
///
/// * Absent `local`: shallow clone (depth 1) of `branch` or the default
///   branch. With `sparse_paths`, a blob-filtered sparse clone restricted to
///   the given top-level paths (two steps: filtered clone, then declare the
///   sparse set). This bounds network and disk cost for large remotes.
/// * Present `local`: `git reset --hard` then `git pull`. Failures here are
///   non-fatal; the stale tree is used as-is.
///
/// Calling twice with no intervening remote changes leaves `local` in the
/// same content state both times.
pub fn sync(
    exec: &Executor,
    remote: &str,
    local: &Path,
    branch: Option<&str>,
    sparse_paths: Option<&[String]>,
) -> Result<SyncOutcome> {
    if local.exists() {
        return Ok(update_existing(exec, remote, local));
    }

    match sparse_paths {
        Some(paths) if !paths.is_empty() => clone_sparse(exec, remote, local, paths),
        _ => clone_full(exec, remote, local, branch),
    }
}

fn update_existing(exec: &Executor, remote: &str, local: &Path) -> SyncOutcome {
    log_status!("sync", "{} already exists, updating", local.display());
    let options = ExecOptions::in_dir(local);

    let update = exec
        .run("git", &["reset", "--hard"], "git reset", &options)
        .and_then(|_| exec.run("git", &["pull"], "git pull", &options));

    match update {
        Ok(_) => SyncOutcome::Updated,
        Err(e) => {
            let warning = format!(
                "Failed to update {} from {}, continuing with stale checkout: {}",
                local.display(),
                remote,
                e
            );
            log_status!("sync", "{}", warning);
            let _ = exec.log().note(&warning);
            SyncOutcome::StaleKept { warning }
        }
    }
}

fn clone_full(
    exec: &Executor,
    remote: &str,
    local: &Path,
    branch: Option<&str>,
) -> Result<SyncOutcome> {
    let local_str = local.to_string_lossy();
    let mut args = vec!["clone", "--depth=1"];
    if let Some(b) = branch {
        args.push("--branch");
        args.push(b);
    }
    args.push(remote);
    args.push(&local_str);

    exec.run("git", &args, "git clone", &ExecOptions::default())?;
    Ok(SyncOutcome::Cloned)
}

fn clone_sparse(
    exec: &Executor,
    remote: &str,
    local: &Path,
    sparse_paths: &[String],
) -> Result<SyncOutcome> {
    let local_str = local.to_string_lossy();
    exec.run(
        "git",
        &[
            "clone",
            "--depth=1",
            "--filter=blob:none",
            "--sparse",
            remote,
            &local_str,
        ],
        "git clone (sparse)",
        &ExecOptions::default(),
    )?;

    // The sparse set is declared from inside the fresh checkout; the child
    // process gets an explicit working directory, ours never changes.
    let in_checkout = ExecOptions::in_dir(local);
    exec.run(
        "git",
        &["sparse-checkout", "init"],
        "git sparse-checkout init",
        &in_checkout,
    )?;

    let mut set_args = vec!["sparse-checkout", "set"];
    set_args.extend(sparse_paths.iter().map(String::as_str));
    exec.run("git", &set_args, "git sparse-checkout set", &in_checkout)?;

    Ok(SyncOutcome::Cloned)
}
