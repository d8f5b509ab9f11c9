//! Day-scoped cache of sink pipelines
//!
//! The registry hands out one pipeline per stream name per calendar day.
//! The first lookup on a new day drops every cached pipeline and creates the
//! new day's partition directory, so each stream reopens under the new date.

use std::collections::HashMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tracing::debug;

use crate::error::LogError;

use super::clock::Clock;
use super::level::LogLevel;
use super::sink::{ConsoleWriter, SinkPipeline};

/// Extension appended to stream names
const LOG_EXTENSION: &str = "log";

struct RegistryState {
    /// Partition directory name of the most recent lookup (`YYYY-MM-DD`)
    active_date: String,
    sinks: HashMap<String, Arc<SinkPipeline>>,
}

/// Stream name to pipeline mapping for the active day
pub struct Registry {
    base_dir: PathBuf,
    file_level: LogLevel,
    console: ConsoleWriter,
    clock: Arc<dyn Clock>,
    state: Mutex<RegistryState>,
}

impl Registry {
    /// Create a registry and today's partition directory
    pub fn new(
        base_dir: PathBuf,
        file_level: LogLevel,
        console: ConsoleWriter,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, LogError> {
        let active_date = clock.partition();
        ensure_partition(&base_dir, &active_date)?;

        Ok(Self {
            base_dir,
            file_level,
            console,
            clock,
            state: Mutex::new(RegistryState {
                active_date,
                sinks: HashMap::new(),
            }),
        })
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    /// Get the pipeline for `stream`, building it on first use today
    ///
    /// Construction happens under the registry lock, so concurrent callers
    /// always share a single pipeline per stream and day.
    pub fn resolve(&self, stream: &str) -> Result<Arc<SinkPipeline>, LogError> {
        validate_stream_name(stream)?;

        let mut state = self.lock_state();

        let today = self.clock.partition();
        if state.active_date != today {
            debug!(
                from = %state.active_date,
                to = %today,
                dropped = state.sinks.len(),
                "Day rolled over, dropping cached sinks"
            );
            state.active_date = today;
            state.sinks.clear();
            ensure_partition(&self.base_dir, &state.active_date)?;
        }

        if let Some(sink) = state.sinks.get(stream) {
            return Ok(Arc::clone(sink));
        }

        let path = self
            .base_dir
            .join(&state.active_date)
            .join(format!("{}.{}", stream, LOG_EXTENSION));
        let sink = Arc::new(SinkPipeline::build(
            stream,
            path,
            self.file_level,
            Arc::clone(&self.console),
        )?);
        debug!(stream, path = %sink.path().display(), "Opened log stream");

        state.sinks.insert(stream.to_string(), Arc::clone(&sink));
        Ok(sink)
    }

    /// Flush every cached pipeline's file, then the shared console once
    ///
    /// Errors are ignored.
    pub fn flush_all(&self) {
        let state = self.lock_state();
        for sink in state.sinks.values() {
            sink.flush();
        }
        drop(state);

        if let Ok(mut console) = self.console.lock() {
            let _ = console.flush();
        }
    }

    /// Partition directory name of the most recent lookup
    pub fn active_date(&self) -> String {
        self.lock_state().active_date.clone()
    }

    /// Stream names with a cached pipeline, sorted
    pub fn cached_streams(&self) -> Vec<String> {
        let mut streams: Vec<String> = self.lock_state().sinks.keys().cloned().collect();
        streams.sort();
        streams
    }

    // The state is valid after any panic, so a poisoned lock is still usable
    fn lock_state(&self) -> MutexGuard<'_, RegistryState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Create `base_dir/date`, succeeding if it already exists
fn ensure_partition(base_dir: &Path, date: &str) -> Result<(), LogError> {
    let path = base_dir.join(date);
    fs::create_dir_all(&path).map_err(|source| LogError::CreateDir { path, source })
}

/// Reject names that are empty or would leave the partition directory
pub fn validate_stream_name(stream: &str) -> Result<(), LogError> {
    let invalid = stream.is_empty()
        || stream == "."
        || stream == ".."
        || stream.contains(['/', '\\', '\0']);
    if invalid {
        return Err(LogError::InvalidStreamName(stream.to_string()));
    }
    Ok(())
}
