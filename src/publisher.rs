//! Build and publish stages: subprocess invocations of the IG publisher jar.
//!
//! Both stages run with error detection on because the jar can print fatal
//! diagnostics while exiting 0. They are terminal on first detected error;
//! the tool's state after a partial build or publish is not safely resumable,
//! so no retry is attempted.

use crate::error::Result;
use crate::executor::{CommandResult, ExecOptions, Executor, PUSH_FAILURE_PATTERNS};
use crate::log_status;
use crate::paths::RunPaths;

/// Validation build: `publisher -ig <source> -package-cache-folder <cache>`.
pub fn build(exec: &Executor, paths: &RunPaths) -> Result<CommandResult> {
    log_status!("build", "Building IG from {}", paths.source.display());
    let args = build_args(paths);
    let arg_refs: Vec<&str> = args.iter().map(String::as_str).collect();
    exec.run(
        "java",
        &arg_refs,
        "ig publisher build",
        &ExecOptions::detecting(&[]),
    )
}

/// Full publish (`-go-publish`) against the synchronized working trees.
///
/// The pattern set is extended with push/authentication signatures: this is
/// the stage most likely to attempt a network write.
pub fn publish(exec: &Executor, paths: &RunPaths) -> Result<CommandResult> {
    log_status!("publish", "Publishing into {}", paths.webroot.display());
    let args = publish_args(paths);
    let arg_refs: Vec<&str> = args.iter().map(String::as_str).collect();
    exec.run(
        "java",
        &arg_refs,
        "ig publisher go-publish",
        &ExecOptions::detecting(PUSH_FAILURE_PATTERNS),
    )
}

fn build_args(paths: &RunPaths) -> Vec<String> {
    vec![
        "-Xmx4g".to_string(),
        "-jar".to_string(),
        paths.publisher_jar.to_string_lossy().into_owned(),
        "publisher".to_string(),
        "-ig".to_string(),
        paths.source.to_string_lossy().into_owned(),
        "-package-cache-folder".to_string(),
        paths.package_cache.to_string_lossy().into_owned(),
    ]
}

fn publish_args(paths: &RunPaths) -> Vec<String> {
    vec![
        "-Xmx4g".to_string(),
        "-Dfile.encoding=UTF-8".to_string(),
        "-jar".to_string(),
        paths.publisher_jar.to_string_lossy().into_owned(),
        "-go-publish".to_string(),
        "-package-cache-folder".to_string(),
        paths.package_cache.to_string_lossy().into_owned(),
        "-source".to_string(),
        paths.source.to_string_lossy().into_owned(),
        "-web".to_string(),
        paths.webroot.to_string_lossy().into_owned(),
        "-temp".to_string(),
        paths.temp.to_string_lossy().into_owned(),
        "-registry".to_string(),
        paths.registry_json().to_string_lossy().into_owned(),
        "-history".to_string(),
        paths.history_template.to_string_lossy().into_owned(),
        "-templates".to_string(),
        paths.webroot_templates().to_string_lossy().into_owned(),
    ]
}
