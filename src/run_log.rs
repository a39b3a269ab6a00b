use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::error::Result;

/// Append-only log file for one publish run.
///
/// Every command invocation writes its full captured output here before any
/// error is surfaced, so diagnostics survive faulty error handling upstream.
#[derive(Debug, Clone)]
pub struct RunLog {
    path: PathBuf,
}

impl RunLog {
    pub fn new(path: &Path) -> Self {
        Self {
            path: path.to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append a single status line.
    pub fn note(&self, message: &str) -> Result<()> {
        self.append(&format!("{} {}\n", timestamp(), message))
    }

    /// Append one command invocation record: header, captured output, footer.
    pub fn record_invocation(
        &self,
        context: &str,
        command_line: &str,
        cwd: Option<&Path>,
        output: &str,
        exit_code: i32,
    ) -> Result<()> {
        let mut entry = format!("==== {} [{}] $ {}", timestamp(), context, command_line);
        if let Some(dir) = cwd {
            entry.push_str(&format!(" (cwd: {})", dir.display()));
        }
        entry.push('\n');
        entry.push_str(output);
        if !output.ends_with('\n') && !output.is_empty() {
            entry.push('\n');
        }
        entry.push_str(&format!("---- exit code: {}\n", exit_code));
        self.append(&entry)
    }

    fn append(&self, text: &str) -> Result<()> {
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        file.write_all(text.as_bytes())?;
        Ok(())
    }
}

fn timestamp() -> String {
    chrono::Local::now().format("%Y-%m-%d %H:%M:%S").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn records_are_appended_in_order() {
        let dir = tempfile::tempdir().unwrap();
        let log = RunLog::new(&dir.path().join("run.log"));

        log.note("starting").unwrap();
        log.record_invocation("git clone", "git clone url dest", None, "done\n", 0)
            .unwrap();
        log.note("finished").unwrap();

        let content = std::fs::read_to_string(log.path()).unwrap();
        let start = content.find("starting").unwrap();
        let clone = content.find("git clone url dest").unwrap();
        let end = content.find("finished").unwrap();
        assert!(start < clone && clone < end);
        assert!(content.contains("---- exit code: 0"));
    }

    #[test]
    fn invocation_records_cwd_when_given() {
        let dir = tempfile::tempdir().unwrap();
        let log = RunLog::new(&dir.path().join("run.log"));

        log.record_invocation(
            "git pull",
            "git pull",
            Some(Path::new("/work/webroot")),
            "Already up to date.\n",
            0,
        )
        .unwrap();

        let content = std::fs::read_to_string(log.path()).unwrap();
        assert!(content.contains("(cwd: /work/webroot)"));
        assert!(content.contains("Already up to date."));
    }
}
