//! Commit and push prepared web content back to the webroot repository.
//!
//! State machine over the webroot working tree:
//! clean -> branched -> staged -> {committed | no-op} -> {pushed | skipped}.
//!
//! Only branch creation happens on the remote side; opening a pull request
//! is an external action. A git failure mid-sequence aborts the stage and
//! leaves the partial local state in place for operator inspection.

use std::fs;
use std::path::Path;

use chrono::Local;
use serde::Serialize;

use crate::deploy::copy_tree;
use crate::error::{Error, Result};
use crate::executor::{ExecOptions, Executor};
use crate::log_status;

/// Outcome of one publish attempt.
///
/// `NoOp` means the mirrored content was byte-identical to what is already
/// committed: nothing was committed or pushed, and that is a valid success.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PublishOutcome {
    NoOp { branch: String },
    Committed { branch: String, pushed: bool },
}

/// Mirror `deploy_dir/<subpath>` into the working tree on a fresh branch,
/// commit, and optionally push.
///
/// The branch name is timestamp-suffixed to avoid collisions across repeated
/// runs. Mirroring uses delete-then-copy semantics so removed files are
/// reflected. When `token` is configured it is substituted into the HTTPS
/// remote URL before pushing.
pub fn publish_changes(
    exec: &Executor,
    worktree: &Path,
    deploy_dir: &Path,
    subpath: &str,
    remote_url: &str,
    token: Option<&str>,
    push: bool,
) -> Result<PublishOutcome> {
    // Checked before any branch or network work so a doomed run fails fast.
    if push && remote_url.starts_with("https://") && token.is_none() {
        return Err(Error::Precondition(format!(
            "Push to {} requires a credential; configure a token or disable push",
            remote_url
        )));
    }

    let branch = format!("update-{}-{}", subpath, Local::now().format("%Y%m%d-%H%M%S"));
    let in_worktree = ExecOptions::in_dir(worktree);

    log_status!("publish", "Creating branch {}", branch);
    exec.run(
        "git",
        &["checkout", "-b", &branch],
        "git checkout -b",
        &in_worktree,
    )?;

    mirror_subpath(deploy_dir, worktree, subpath)?;

    let staged_path = format!("{}/", subpath);
    exec.run("git", &["add", &staged_path], "git add", &in_worktree)?;

    // Exit 0 means the staged diff is empty: nothing to commit or push.
    let diff = exec.run_unchecked(
        "git",
        &["diff", "--staged", "--quiet"],
        "git diff --staged",
        &in_worktree,
    )?;
    if diff.success() {
        log_status!("publish", "No changes to commit");
        return Ok(PublishOutcome::NoOp { branch });
    }

    let message = format!("Update {} IG content", subpath);
    exec.run(
        "git",
        &["commit", "-m", &message],
        "git commit",
        &in_worktree,
    )?;

    if !push {
        log_status!("publish", "Committed {} (push disabled)", branch);
        return Ok(PublishOutcome::Committed {
            branch,
            pushed: false,
        });
    }

    if let Some(token) = token {
        let authenticated = authenticated_remote(remote_url, token);
        exec.run(
            "git",
            &["remote", "set-url", "origin", &authenticated],
            "git remote set-url",
            &in_worktree,
        )?;
    }

    exec.run(
        "git",
        &["push", "origin", &branch],
        "git push",
        &in_worktree,
    )?;
    log_status!("publish", "Pushed branch {}", branch);

    Ok(PublishOutcome::Committed {
        branch,
        pushed: true,
    })
}

/// Replace `worktree/<subpath>` with `deploy_dir/<subpath>`.
/// Deleting first ensures files removed from the deploy output disappear
/// from the working tree as well.
fn mirror_subpath(deploy_dir: &Path, worktree: &Path, subpath: &str) -> Result<()> {
    let source = deploy_dir.join(subpath);
    if !source.exists() {
        return Err(Error::Config(format!(
            "Deploy output has no '{}' directory under {}",
            subpath,
            deploy_dir.display()
        )));
    }

    let target = worktree.join(subpath);
    if target.exists() {
        fs::remove_dir_all(&target)?;
    }
    copy_tree(&source, &target)?;
    Ok(())
}

/// Insert a token into an HTTPS remote URL.
fn authenticated_remote(remote_url: &str, token: &str) -> String {
    match remote_url.strip_prefix("https://") {
        Some(rest) => format!("https://{}@{}", token, rest),
        None => remote_url.to_string(),
    }
}
