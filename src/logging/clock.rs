//! Wall-clock source for record timestamps and date partitions

use std::sync::{Mutex, PoisonError};

use chrono::{Duration, Local, NaiveDateTime};

/// Date format used for partition directory names
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Source of the current local time
///
/// Production code uses [`SystemClock`]. [`ManualClock`] exists for tests
/// that need to control the date.
pub trait Clock: Send + Sync {
    /// Current local wall time
    fn now(&self) -> NaiveDateTime;

    /// Name of the partition directory for the current day
    fn partition(&self) -> String {
        self.now().format(DATE_FORMAT).to_string()
    }
}

/// Clock backed by the system's local time
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> NaiveDateTime {
        Local::now().naive_local()
    }
}

/// Test clock that only moves when told to
///
/// A testing aid for simulating day rollover and evaluating retention at a
/// fixed date. Never use it in production: records would carry the frozen
/// time and partitions would never roll over.
///
/// ```
/// use std::sync::{Arc, Mutex};
///
/// use chrono::{Duration, NaiveDate};
/// use daylog::logging::{Clock, ConsoleWriter, ManualClock};
/// use daylog::{Logger, LoggerConfig};
///
/// let dir = tempfile::tempdir()?;
/// let start = NaiveDate::from_ymd_opt(2024, 1, 10)
///     .unwrap()
///     .and_hms_opt(23, 59, 0)
///     .unwrap();
/// let clock = Arc::new(ManualClock::new(start));
/// let console: ConsoleWriter = Arc::new(Mutex::new(std::io::sink()));
/// let config = LoggerConfig::new("info", 1, dir.path(), 7, false, true);
/// let logger = Logger::with_parts(config, console, clock.clone())?;
///
/// logger.info("user", "registration", "before midnight", &[]);
/// clock.advance(Duration::minutes(2));
/// logger.info("user", "registration", "after midnight", &[]);
///
/// assert_eq!(clock.partition(), "2024-01-11");
/// assert!(dir.path().join("2024-01-10/user.log").exists());
/// assert!(dir.path().join("2024-01-11/user.log").exists());
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
#[derive(Debug)]
pub struct ManualClock {
    now: Mutex<NaiveDateTime>,
}

impl ManualClock {
    /// Create a clock frozen at `now`
    pub fn new(now: NaiveDateTime) -> Self {
        Self {
            now: Mutex::new(now),
        }
    }

    /// Jump to a specific time
    pub fn set(&self, now: NaiveDateTime) {
        *self.now.lock().unwrap_or_else(PoisonError::into_inner) = now;
    }

    /// Move the clock forward by `by`
    pub fn advance(&self, by: Duration) {
        *self.now.lock().unwrap_or_else(PoisonError::into_inner) += by;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> NaiveDateTime {
        *self.now.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
