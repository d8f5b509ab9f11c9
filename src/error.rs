//! Error type for the logging engine

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Errors raised while opening or maintaining log partitions
///
/// Only directory and file creation failures reach the application; the
/// facade never reports write or flush failures.
#[derive(Debug, Error)]
pub enum LogError {
    #[error("failed to create log directory {}: {source}", path.display())]
    CreateDir { path: PathBuf, source: io::Error },

    #[error("failed to open log file {}: {source}", path.display())]
    OpenFile { path: PathBuf, source: io::Error },

    #[error("failed to list log directory {}: {source}", path.display())]
    ReadDir { path: PathBuf, source: io::Error },

    #[error("invalid stream name {0:?}")]
    InvalidStreamName(String),

    #[error("unknown log level {0:?}")]
    UnknownLevel(String),
}
