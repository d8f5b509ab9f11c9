//! Logging engine for daylog
//!
//! Provides per-stream sink pipelines, the day-scoped registry that caches and
//! rotates them, the retention sweeper and the [`Logger`] facade.

mod clock;
mod level;
mod logger;
mod record;
mod registry;
mod retention;
mod sink;

pub use clock::{Clock, ManualClock, SystemClock, DATE_FORMAT};
pub use level::LogLevel;
pub use logger::Logger;
pub use record::{field, Caller, Field, Record, MODULE_KEY, TIME_FORMAT};
pub use registry::{validate_stream_name, Registry};
pub use retention::{
    parse_partition_date, spawn_sweeper, sweep_expired, SweeperHandle, DEFAULT_RETENTION_DAYS,
    SWEEP_INTERVAL,
};
pub use sink::{stdout_console, ConsoleWriter, SinkPipeline, CONSOLE_LEVEL};
