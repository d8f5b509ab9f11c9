//! Logger facade
//!
//! [`Logger`] owns the configuration, the sink registry and the retention
//! sweeper. Applications create one at startup and share it by reference.
//!
//! ```rust,no_run
//! use daylog::{field, Logger, LoggerConfig};
//!
//! let logger = Logger::new(LoggerConfig::new("info", 1, "./logs", 7, false, false))?;
//! logger.info("user", "registration", "signup succeeded", &[field("user_id", 42)]);
//! # Ok::<(), daylog::LogError>(())
//! ```

use std::panic::Location;
use std::sync::Arc;

use tracing::info;

use crate::config::LoggerConfig;
use crate::error::LogError;

use super::clock::{Clock, SystemClock};
use super::level::LogLevel;
use super::record::{Caller, Field, Record};
use super::registry::Registry;
use super::retention::{spawn_sweeper, SweeperHandle, SWEEP_INTERVAL};
use super::sink::{stdout_console, ConsoleWriter, SinkPipeline};

/// Date-partitioned, per-stream logger
pub struct Logger {
    config: LoggerConfig,
    clock: Arc<dyn Clock>,
    registry: Registry,
    sweeper: Option<SweeperHandle>,
}

impl Logger {
    /// Create a logger writing to stdout and the system clock
    ///
    /// Creates today's partition directory and, when enabled, starts the
    /// retention sweeper.
    pub fn new(config: LoggerConfig) -> Result<Self, LogError> {
        Self::with_parts(config, stdout_console(), Arc::new(SystemClock))
    }

    /// Create a logger with an explicit console writer and clock
    pub fn with_parts(
        config: LoggerConfig,
        console: ConsoleWriter,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, LogError> {
        let registry = Registry::new(
            config.base_dir.clone(),
            config.level,
            console,
            Arc::clone(&clock),
        )?;

        let sweeper = if config.sweeper_enabled() {
            spawn_sweeper(
                config.base_dir.clone(),
                config.retention_days,
                Arc::clone(&clock),
                SWEEP_INTERVAL,
            )
        } else {
            None
        };

        info!(
            base_dir = %config.base_dir.display(),
            level = %config.level,
            retention_days = config.retention_days,
            flush_on_write = config.flush_on_write,
            "Logger initialized"
        );

        Ok(Self {
            config,
            clock,
            registry,
            sweeper,
        })
    }

    pub fn config(&self) -> &LoggerConfig {
        &self.config
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Whether a retention sweeper was started for this logger
    pub fn sweeper_running(&self) -> bool {
        self.sweeper.is_some()
    }

    /// Get the pipeline for `stream`, opening it on first use today
    pub fn resolve(&self, stream: &str) -> Result<Arc<SinkPipeline>, LogError> {
        self.registry.resolve(stream)
    }

    /// Open the given streams up front so open failures surface at startup
    pub fn preopen(&self, streams: &[&str]) -> Result<(), LogError> {
        for stream in streams {
            self.registry.resolve(stream)?;
        }
        Ok(())
    }

    /// Flush every open stream to disk, ignoring errors
    pub fn flush_all(&self) {
        self.registry.flush_all();
    }

    /// Write one record, returning open failures instead of panicking
    ///
    /// `category` is appended after `fields` as the `module` field. The
    /// `caller` field is chosen by [`LoggerConfig::caller_skip`], see
    /// [`Logger::caller`].
    #[track_caller]
    pub fn log(
        &self,
        level: LogLevel,
        stream: &str,
        category: &str,
        message: &str,
        fields: &[Field],
    ) -> Result<(), LogError> {
        let caller = self.caller(Location::caller());
        let sink = self.registry.resolve(stream)?;

        sink.write(&Record {
            time: self.clock.now(),
            level,
            logger: stream,
            caller: &caller,
            message,
            fields,
            module: category,
        });
        drop(sink);

        if self.config.flush_on_write {
            self.flush_all();
        }
        Ok(())
    }

    /// Source position to attribute a record to
    ///
    /// `call_site` is where the application called into the facade. With
    /// `caller_skip` 1 (the default) that is the answer. Each step above 1
    /// moves one frame further out, so a helper that wraps the facade can
    /// attribute records to its own callers. 0 names the facade frame itself.
    /// Skips other than 1 walk the stack and need debug info; without it the
    /// call site is used.
    fn caller(&self, call_site: &'static Location<'static>) -> Caller {
        match self.config.caller_skip {
            1 => Caller::from(call_site),
            skip => frame_above_facade(skip).unwrap_or_else(|| Caller::from(call_site)),
        }
    }

    #[track_caller]
    pub fn debug(&self, stream: &str, category: &str, message: &str, fields: &[Field]) {
        self.emit(LogLevel::Debug, stream, category, message, fields);
    }

    #[track_caller]
    pub fn info(&self, stream: &str, category: &str, message: &str, fields: &[Field]) {
        self.emit(LogLevel::Info, stream, category, message, fields);
    }

    #[track_caller]
    pub fn warn(&self, stream: &str, category: &str, message: &str, fields: &[Field]) {
        self.emit(LogLevel::Warn, stream, category, message, fields);
    }

    #[track_caller]
    pub fn error(&self, stream: &str, category: &str, message: &str, fields: &[Field]) {
        self.emit(LogLevel::Error, stream, category, message, fields);
    }

    /// Write failures are swallowed; an unopenable stream halts the caller.
    #[track_caller]
    fn emit(
        &self,
        level: LogLevel,
        stream: &str,
        category: &str,
        message: &str,
        fields: &[Field],
    ) {
        if let Err(e) = self.log(level, stream, category, message, fields) {
            panic!("cannot log to stream {:?}: {}", stream, e);
        }
    }
}

/// Symbol path shared by every `Logger` method
const FACADE_SYMBOL: &str = concat!(module_path!(), "::Logger");

/// Walk the stack to the frame `skip` levels out from the outermost
/// `Logger` method
///
/// Inlined calls are counted as frames. Returns `None` when the frame is
/// missing or has no file and line information.
fn frame_above_facade(skip: usize) -> Option<Caller> {
    let mut depth: Option<usize> = None;
    let mut found: Option<Caller> = None;
    let mut done = false;

    backtrace::trace(|frame| {
        backtrace::resolve_frame(frame, |symbol| {
            if done {
                return;
            }
            let in_facade = symbol
                .name()
                .map(|name| name.to_string().contains(FACADE_SYMBOL))
                .unwrap_or(false);

            depth = match (in_facade, depth) {
                (true, _) => Some(0),
                (false, Some(d)) => Some(d + 1),
                (false, None) => None,
            };

            match depth {
                Some(d) if d == skip => {
                    found = match (symbol.filename(), symbol.lineno()) {
                        (Some(file), Some(line)) => {
                            Some(Caller::new(file.to_string_lossy(), line))
                        }
                        _ => None,
                    };
                    // Outer facade frames may still follow
                    done = !in_facade;
                }
                Some(d) if d > skip => done = true,
                _ => {}
            }
        });
        !done
    });

    found
}

impl Drop for Logger {
    fn drop(&mut self) {
        self.registry.flush_all();
        if let Some(sweeper) = self.sweeper.take() {
            sweeper.shutdown();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logging::clock::ManualClock;
    use crate::logging::record::field;
    use chrono::{Duration, NaiveDate, NaiveDateTime};
    use serde_json::Value;
    use std::sync::Mutex;
    use std::thread;
    use tempfile::TempDir;

    fn noon(y: i32, m: u32, d: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(12, 0, 0)
            .unwrap()
    }

    struct Harness {
        temp_dir: TempDir,
        console: Arc<Mutex<Vec<u8>>>,
        clock: Arc<ManualClock>,
        logger: Logger,
    }

    impl Harness {
        fn new(level: &str, flush_on_write: bool) -> Self {
            Self::with_caller_skip(level, 1, flush_on_write)
        }

        fn with_caller_skip(level: &str, caller_skip: usize, flush_on_write: bool) -> Self {
            let temp_dir = TempDir::new().unwrap();
            let console = Arc::new(Mutex::new(Vec::<u8>::new()));
            let clock = Arc::new(ManualClock::new(noon(2024, 1, 10)));
            let config = LoggerConfig::new(
                level,
                caller_skip,
                temp_dir.path(),
                7,
                false,
                flush_on_write,
            );
            let logger = Logger::with_parts(config, console.clone(), clock.clone()).unwrap();
            Self {
                temp_dir,
                console,
                clock,
                logger,
            }
        }

        fn file_lines(&self, date: &str, stream: &str) -> Vec<Value> {
            let path = self
                .temp_dir
                .path()
                .join(date)
                .join(format!("{}.log", stream));
            std::fs::read_to_string(path)
                .unwrap_or_default()
                .lines()
                .map(|l| serde_json::from_str(l).unwrap())
                .collect()
        }

        fn console_lines(&self) -> Vec<Value> {
            let bytes = self.console.lock().unwrap().clone();
            String::from_utf8(bytes)
                .unwrap()
                .lines()
                .map(|l| serde_json::from_str(l).unwrap())
                .collect()
        }
    }

    #[test]
    fn test_info_writes_file_and_console() {
        let h = Harness::new("info", false);

        h.logger.info("user", "registration", "signup succeeded", &[]);
        h.logger.flush_all();

        let file = h.file_lines("2024-01-10", "user");
        let console = h.console_lines();
        assert_eq!(file.len(), 1);
        assert_eq!(console.len(), 1);

        for record in [&file[0], &console[0]] {
            assert_eq!(record["module"], "registration");
            assert_eq!(record["message"], "signup succeeded");
            assert_eq!(record["level"], "info");
            assert_eq!(record["logger"], "user");
            assert_eq!(record["time"], "2024-01-10 12:00:00.000");
        }
    }

    #[test]
    fn test_caller_points_at_call_site() {
        let h = Harness::new("debug", true);

        let line = line!() + 1;
        h.logger.warn("user", "auth", "bad password", &[]);

        let file = h.file_lines("2024-01-10", "user");
        let expected = format!("logging/logger.rs:{}", line);
        assert_eq!(file[0]["caller"], expected.as_str());
    }

    /// Application helper in front of the facade; returns the line of its
    /// facade call
    #[inline(never)]
    fn audit(logger: &Logger, message: &str) -> u32 {
        let line = line!() + 1;
        logger.info("audit", "helpers", message, &[]);
        line
    }

    fn caller_with_skip(caller_skip: usize) -> (String, u32, u32) {
        let h = Harness::with_caller_skip("debug", caller_skip, true);

        let outer_line = line!() + 1;
        let helper_line = audit(&h.logger, "via helper");

        let file = h.file_lines("2024-01-10", "audit");
        let caller = file[0]["caller"].as_str().unwrap().to_string();
        (caller, helper_line, outer_line)
    }

    #[test]
    fn test_caller_skip_moves_attribution_outward() {
        let (skip_one, helper_line, outer_line) = caller_with_skip(1);
        assert_eq!(skip_one, format!("logging/logger.rs:{}", helper_line));

        let (skip_two, _, _) = caller_with_skip(2);
        assert_eq!(skip_two, format!("logging/logger.rs:{}", outer_line));
        assert_ne!(skip_two, skip_one);

        // The facade's own frame, not the application
        let (skip_zero, _, _) = caller_with_skip(0);
        assert!(skip_zero.starts_with("logging/logger.rs:"));
        assert_ne!(skip_zero, skip_one);
        assert_ne!(skip_zero, skip_two);
    }

    #[test]
    fn test_caller_skip_past_stack_falls_back_to_call_site() {
        let (caller, helper_line, _) = caller_with_skip(10_000);
        assert_eq!(caller, format!("logging/logger.rs:{}", helper_line));
    }

    #[test]
    fn test_module_field_follows_caller_fields() {
        let h = Harness::new("debug", true);

        h.logger.debug(
            "order",
            "orders",
            "generating order number",
            &[field("order_id", 1042), field("rush", false)],
        );

        let path = h.temp_dir.path().join("2024-01-10/order.log");
        let text = std::fs::read_to_string(path).unwrap();
        let order_id = text.find("\"order_id\"").unwrap();
        let rush = text.find("\"rush\"").unwrap();
        let module = text.find("\"module\"").unwrap();
        assert!(order_id < rush && rush < module);
    }

    #[test]
    fn test_threshold_filters_file_only() {
        for threshold in LogLevel::ALL {
            let h = Harness::new(threshold.as_str(), false);

            h.logger.debug("s", "c", "debug", &[]);
            h.logger.info("s", "c", "info", &[]);
            h.logger.warn("s", "c", "warn", &[]);
            h.logger.error("s", "c", "error", &[]);
            h.logger.flush_all();

            let file: Vec<String> = h
                .file_lines("2024-01-10", "s")
                .iter()
                .map(|r| r["level"].as_str().unwrap().to_string())
                .collect();
            let expected: Vec<&str> = LogLevel::ALL
                .iter()
                .filter(|l| **l >= threshold)
                .map(|l| l.as_str())
                .collect();

            assert_eq!(file, expected, "threshold {}", threshold);
            assert_eq!(h.console_lines().len(), 4, "threshold {}", threshold);
        }
    }

    #[test]
    fn test_flush_on_write_is_visible_immediately() {
        let h = Harness::new("info", true);

        h.logger.error("order", "orders", "insufficient stock", &[]);

        // No explicit flush
        let file = h.file_lines("2024-01-10", "order");
        assert_eq!(file.len(), 1);
        assert_eq!(file[0]["message"], "insufficient stock");
    }

    #[test]
    fn test_rollover_switches_partition() {
        let h = Harness::new("info", true);

        h.logger.info("user", "registration", "day one", &[]);
        h.clock.advance(Duration::days(1));
        h.logger.info("user", "registration", "day two", &[]);
        h.logger.info("user", "registration", "day two again", &[]);

        let old = h.file_lines("2024-01-10", "user");
        let new = h.file_lines("2024-01-11", "user");
        assert_eq!(old.len(), 1);
        assert_eq!(old[0]["message"], "day one");
        assert_eq!(new.len(), 2);
        assert_eq!(new[0]["time"], "2024-01-11 12:00:00.000");
    }

    #[test]
    fn test_concurrent_emission_keeps_lines_whole() {
        const THREADS: usize = 8;
        const RECORDS: usize = 200;

        let h = Harness::new("debug", false);
        let logger = &h.logger;

        thread::scope(|scope| {
            for t in 0..THREADS {
                scope.spawn(move || {
                    for i in 0..RECORDS {
                        logger.info(
                            "shared",
                            "load",
                            "concurrent write",
                            &[field("thread", t), field("seq", i)],
                        );
                    }
                });
            }
        });
        logger.flush_all();

        let file = h.file_lines("2024-01-10", "shared");
        assert_eq!(file.len(), THREADS * RECORDS);

        // Per-thread order is preserved
        for t in 0..THREADS {
            let seqs: Vec<u64> = file
                .iter()
                .filter(|r| r["thread"] == t)
                .map(|r| r["seq"].as_u64().unwrap())
                .collect();
            assert_eq!(seqs, (0..RECORDS as u64).collect::<Vec<_>>());
        }
        assert_eq!(h.console_lines().len(), THREADS * RECORDS);
    }

    #[test]
    fn test_log_reports_invalid_stream() {
        let h = Harness::new("info", false);
        let result = h.logger.log(LogLevel::Info, "../etc", "c", "m", &[]);
        assert!(matches!(result, Err(LogError::InvalidStreamName(_))));
    }

    #[test]
    #[should_panic(expected = "cannot log to stream")]
    fn test_facade_panics_when_stream_cannot_open() {
        let h = Harness::new("info", false);
        h.logger.info("", "c", "m", &[]);
    }

    #[test]
    fn test_preopen_creates_files() {
        let h = Harness::new("info", false);
        h.logger.preopen(&["user", "order"]).unwrap();

        assert!(h.temp_dir.path().join("2024-01-10/user.log").exists());
        assert!(h.temp_dir.path().join("2024-01-10/order.log").exists());
        assert_eq!(h.logger.registry().cached_streams(), vec!["order", "user"]);
    }

    #[test]
    fn test_no_sweeper_when_disabled() {
        let temp_dir = TempDir::new().unwrap();
        let console: ConsoleWriter = Arc::new(Mutex::new(std::io::sink()));
        let clock = Arc::new(ManualClock::new(noon(2024, 1, 10)));

        let config = LoggerConfig::new("info", 1, temp_dir.path(), 7, false, false);
        let logger = Logger::with_parts(config, Arc::clone(&console), clock.clone()).unwrap();
        assert!(!logger.sweeper_running());

        let config = LoggerConfig::new("info", 1, temp_dir.path(), 0, true, false);
        let logger = Logger::with_parts(config, console, clock).unwrap();
        assert!(!logger.sweeper_running());
    }

    #[test]
    fn test_sweeper_started_when_enabled() {
        let temp_dir = TempDir::new().unwrap();
        std::fs::create_dir_all(temp_dir.path().join("2023-06-01")).unwrap();
        let console: ConsoleWriter = Arc::new(Mutex::new(std::io::sink()));
        let clock = Arc::new(ManualClock::new(noon(2024, 1, 10)));

        let config = LoggerConfig::new("info", 1, temp_dir.path(), 7, true, false);
        let logger = Logger::with_parts(config, console, clock).unwrap();
        assert!(logger.sweeper_running());

        let expired = temp_dir.path().join("2023-06-01");
        for _ in 0..100 {
            if !expired.exists() {
                break;
            }
            thread::sleep(std::time::Duration::from_millis(20));
        }
        assert!(!expired.exists());
        assert!(temp_dir.path().join("2024-01-10").exists());
    }
}
