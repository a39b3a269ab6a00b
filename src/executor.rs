//! Command execution with captured output and failure-pattern detection.
//!
//! The wrapped IG publisher is known to print fatal diagnostics while still
//! exiting 0, so exit status alone is not a trustworthy success signal.
//! Callers opt into scanning the captured text against failure patterns.

use std::path::{Path, PathBuf};
use std::process::Command;

use regex::Regex;

use crate::error::{Error, Result};
use crate::run_log::RunLog;

/// Failure signatures matched against captured output regardless of exit code.
pub const DEFAULT_FAILURE_PATTERNS: &[&str] = &[
    r"(?m)\bFATAL\b",
    r"(?m)^\s*ERROR\b",
    r"Exception in thread",
    r"(?m)^\s+at [A-Za-z_$][\w.$]*\(",
    r"(?i)authentication failed",
    r"(?i)permission denied",
    r"\[rejected\]",
    r"non-fast-forward",
    r"BUILD FAILED",
    r"Publishing Content Failed",
];

/// Additional signatures for stages that attempt a remote write.
pub const PUSH_FAILURE_PATTERNS: &[&str] = &[
    r"error: failed to push",
    r"fatal: could not read Username",
    r"! \[remote rejected\]",
    r"(?m)^remote: .*denied",
];

/// Captured result of one process invocation.
///
/// `output` is the merged stdout/stderr text; it is consumed by the calling
/// stage and never persisted beyond the run log.
#[derive(Debug, Clone)]
pub struct CommandResult {
    pub output: String,
    pub exit_code: i32,
}

impl CommandResult {
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }
}

/// Per-invocation options.
#[derive(Debug, Clone, Default)]
pub struct ExecOptions {
    /// Working directory for the child process. The calling process never
    /// changes its own current directory.
    pub cwd: Option<PathBuf>,
    /// Scan captured output against failure patterns, exit-code-independent.
    pub detect_errors: bool,
    /// Patterns unioned with [`DEFAULT_FAILURE_PATTERNS`] when detection is on.
    pub extra_patterns: Vec<String>,
}

impl ExecOptions {
    pub fn in_dir(dir: &Path) -> Self {
        Self {
            cwd: Some(dir.to_path_buf()),
            ..Self::default()
        }
    }

    pub fn detecting(extra_patterns: &[&str]) -> Self {
        Self {
            detect_errors: true,
            extra_patterns: extra_patterns.iter().map(|p| p.to_string()).collect(),
            ..Self::default()
        }
    }
}

/// Runs external processes, logging every invocation to the run log.
pub struct Executor {
    log: RunLog,
}

impl Executor {
    pub fn new(log: RunLog) -> Self {
        Self { log }
    }

    pub fn log(&self) -> &RunLog {
        &self.log
    }

    /// Run a command; fail on non-zero exit or, when detection is enabled,
    /// on the first failure pattern found in the captured output.
    ///
    /// The full captured output is appended to the run log before any error
    /// is returned.
    pub fn run(
        &self,
        program: &str,
        args: &[&str],
        context: &str,
        options: &ExecOptions,
    ) -> Result<CommandResult> {
        let result = self.run_unchecked(program, args, context, options)?;

        if !result.success() {
            return Err(Error::ProcessFailed {
                context: context.to_string(),
                exit_code: result.exit_code,
                output: result.output,
            });
        }

        if options.detect_errors {
            if let Some(pattern) = first_failure_match(&result.output, &options.extra_patterns)? {
                return Err(Error::PatternDetected {
                    context: context.to_string(),
                    pattern,
                    output: result.output,
                });
            }
        }

        Ok(result)
    }

    /// Run a command and return its result without classifying the exit code.
    ///
    /// Useful when a non-zero exit is meaningful rather than fatal
    /// (e.g. `git diff --staged --quiet`). Still logs the invocation.
    pub fn run_unchecked(
        &self,
        program: &str,
        args: &[&str],
        context: &str,
        options: &ExecOptions,
    ) -> Result<CommandResult> {
        let mut command = Command::new(program);
        command.args(args);
        if let Some(dir) = &options.cwd {
            command.current_dir(dir);
        }

        // A program that cannot be spawned at all is a missing-runtime
        // precondition, not a process failure.
        let output = command.output().map_err(|e| {
            Error::Precondition(format!("Failed to run {} ({}): {}", program, context, e))
        })?;

        let merged = merge_output(&output.stdout, &output.stderr);
        let exit_code = output.status.code().unwrap_or(-1);

        self.log.record_invocation(
            context,
            &command_line(program, args),
            options.cwd.as_deref(),
            &merged,
            exit_code,
        )?;

        Ok(CommandResult {
            output: merged,
            exit_code,
        })
    }
}

/// Merge captured stdout and stderr into one diagnostic text.
fn merge_output(stdout: &[u8], stderr: &[u8]) -> String {
    let out = String::from_utf8_lossy(stdout);
    let err = String::from_utf8_lossy(stderr);
    if err.trim().is_empty() {
        out.into_owned()
    } else if out.trim().is_empty() {
        err.into_owned()
    } else {
        format!("{}\n{}", out.trim_end_matches('\n'), err)
    }
}

fn command_line(program: &str, args: &[&str]) -> String {
    let mut line = program.to_string();
    for arg in args {
        line.push(' ');
        line.push_str(arg);
    }
    line
}

/// Scan text against the default pattern set unioned with `extra`.
/// Returns the first matching pattern, scanning extras after the defaults.
fn first_failure_match(text: &str, extra: &[String]) -> Result<Option<String>> {
    for pattern in DEFAULT_FAILURE_PATTERNS
        .iter()
        .map(|p| p.to_string())
        .chain(extra.iter().cloned())
    {
        let re = Regex::new(&pattern)
            .map_err(|e| Error::Config(format!("Invalid failure pattern `{}`: {}", pattern, e)))?;
        if re.is_match(text) {
            return Ok(Some(pattern));
        }
    }
    Ok(None)
}
