use thiserror::Error;

/// Why the process-wide subscriber could not be installed.
#[derive(Debug, Error)]
pub enum LoggerError {
    #[error("unknown log format {0:?}, expected text, json or journald")]
    UnknownFormat(String),
    #[error("journald output is not available in this build")]
    JournaldUnavailable,
    #[error("a global logger is already installed")]
    AlreadyInstalled,
    #[error("cannot install logger: {0}")]
    Install(String),
    #[error("invalid log filter {0:?}")]
    InvalidFilter(String),
}
