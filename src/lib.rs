//! daylog - date-partitioned per-stream file logging
//!
//! Routes records to `base_dir/YYYY-MM-DD/<stream>.log`, mirrors them to the
//! console and removes partitions older than the retention window.

pub mod config;
pub mod error;
pub mod logging;

pub use config::LoggerConfig;
pub use error::LogError;
pub use logging::{field, Field, LogLevel, Logger};
