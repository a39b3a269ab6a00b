use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("{context} exited with code {exit_code}")]
    ProcessFailed {
        context: String,
        exit_code: i32,
        output: String,
    },

    #[error("{context} output matched failure pattern `{pattern}`")]
    PatternDetected {
        context: String,
        pattern: String,
        output: String,
    },

    #[error("Download failed: {0}")]
    DownloadFailed(String),

    #[error("Precondition failed: {0}")]
    Precondition(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yml::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    pub fn code(&self) -> &'static str {
        match self {
            Error::Config(_) => "CONFIG_ERROR",
            Error::ProcessFailed { .. } => "PROCESS_FAILED",
            Error::PatternDetected { .. } => "PATTERN_DETECTED",
            Error::DownloadFailed(_) => "DOWNLOAD_FAILED",
            Error::Precondition(_) => "PRECONDITION_FAILED",
            Error::Io(_) => "IO_ERROR",
            Error::Yaml(_) => "YAML_ERROR",
        }
    }

    /// Captured process output carried by command failures, if any.
    /// The full text is always in the run log; this is for direct display.
    pub fn captured_output(&self) -> Option<&str> {
        match self {
            Error::ProcessFailed { output, .. } => Some(output),
            Error::PatternDetected { output, .. } => Some(output),
            _ => None,
        }
    }
}
