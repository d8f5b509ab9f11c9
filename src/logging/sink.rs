//! Per-stream sink pipeline
//!
//! Each pipeline writes rendered records to an append-only file and to the
//! shared console writer, each behind its own severity threshold.

use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use crate::error::LogError;

use super::level::LogLevel;
use super::record::Record;

/// Console threshold; the console always receives every record
pub const CONSOLE_LEVEL: LogLevel = LogLevel::Debug;

/// Shared console destination
///
/// All pipelines write through the same writer so console lines never
/// interleave, whichever stream they belong to.
pub type ConsoleWriter = Arc<Mutex<dyn Write + Send>>;

/// Console writer backed by the process's standard output
pub fn stdout_console() -> ConsoleWriter {
    Arc::new(Mutex::new(std::io::stdout()))
}

/// File and console destinations for one stream on one day
pub struct SinkPipeline {
    name: String,
    path: PathBuf,
    file: Mutex<BufWriter<File>>,
    file_level: LogLevel,
    console: ConsoleWriter,
}

impl SinkPipeline {
    /// Open `path` for append and pair it with the console writer
    pub fn build(
        name: impl Into<String>,
        path: PathBuf,
        file_level: LogLevel,
        console: ConsoleWriter,
    ) -> Result<Self, LogError> {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .map_err(|source| LogError::OpenFile {
                path: path.clone(),
                source,
            })?;

        Ok(Self {
            name: name.into(),
            path,
            file: Mutex::new(BufWriter::new(file)),
            file_level,
            console,
        })
    }

    /// Stream name this pipeline serves
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Path of the backing log file
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn file_level(&self) -> LogLevel {
        self.file_level
    }

    /// Render and write a record to every destination whose threshold it meets
    ///
    /// Write errors are dropped.
    pub fn write(&self, record: &Record<'_>) {
        let to_file = record.level >= self.file_level;
        let to_console = record.level >= CONSOLE_LEVEL;
        if !to_file && !to_console {
            return;
        }

        let line = record.render();

        if to_file {
            if let Ok(mut file) = self.file.lock() {
                let _ = file.write_all(line.as_bytes());
            }
        }

        if to_console {
            if let Ok(mut console) = self.console.lock() {
                let _ = console.write_all(line.as_bytes());
            }
        }
    }

    /// Push buffered output down to the file
    ///
    /// The console is shared by every pipeline and is flushed by the owner of
    /// the pipelines, once per flush round. Best effort: errors are ignored.
    pub fn flush(&self) {
        if let Ok(mut file) = self.file.lock() {
            if file.flush().is_ok() {
                let _ = file.get_ref().sync_data();
            }
        }
    }
}

impl std::fmt::Debug for SinkPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SinkPipeline")
            .field("name", &self.name)
            .field("path", &self.path)
            .field("file_level", &self.file_level)
            .finish_non_exhaustive()
    }
}
