/// Macro for prefixed status logging to stderr (only when stderr is a terminal).
///
/// Usage:
/// ```ignore
/// log_status!("sync", "Updating {} from {}", path, remote);
/// log_status!("publish", "Pushed branch {}", branch);
/// ```
#[macro_export]
macro_rules! log_status {
    ($prefix:expr, $($arg:tt)*) => {
        if ::std::io::IsTerminal::is_terminal(&::std::io::stderr()) {
            eprintln!(concat!("[", $prefix, "] {}"), format_args!($($arg)*));
        }
    };
}

pub mod artifact;
pub mod config;
pub mod deploy;
pub mod error;
pub mod executor;
pub mod paths;
pub mod pipeline;
pub mod publish_branch;
pub mod publisher;
pub mod run_log;
pub mod sync;

// Re-export common types for convenience
pub use error::{Error, Result};
