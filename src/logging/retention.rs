//! Log partition retention management
//!
//! Removes date partition directories that fall outside the retention window,
//! once at startup and then once per [`SWEEP_INTERVAL`].

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use chrono::{Days, NaiveDate};
use tokio::sync::oneshot;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use crate::error::LogError;

use super::clock::{Clock, DATE_FORMAT};

/// Default retention period in days
pub const DEFAULT_RETENTION_DAYS: i64 = 7;

/// Time between two sweeps
pub const SWEEP_INTERVAL: Duration = Duration::from_secs(24 * 60 * 60);

/// Parse a directory name as a partition date
///
/// Only the exact `YYYY-MM-DD` shape counts as a partition.
pub fn parse_partition_date(name: &str) -> Option<NaiveDate> {
    if name.len() != 10 {
        return None;
    }
    NaiveDate::parse_from_str(name, DATE_FORMAT).ok()
}

/// Remove partitions dated before `today - retention_days`
///
/// Entries that are not directories or whose names are not dates are left
/// alone. Failing to remove one partition does not stop the sweep.
///
/// Returns the number of partitions removed.
pub fn sweep_expired(
    base_dir: &Path,
    retention_days: i64,
    today: NaiveDate,
) -> Result<usize, LogError> {
    let Some(cutoff) = u64::try_from(retention_days)
        .ok()
        .filter(|days| *days > 0)
        .and_then(|days| today.checked_sub_days(Days::new(days)))
    else {
        return Ok(0);
    };

    let entries = fs::read_dir(base_dir).map_err(|source| LogError::ReadDir {
        path: base_dir.to_path_buf(),
        source,
    })?;

    let mut removed = 0;

    for entry in entries.flatten() {
        let is_dir = entry.file_type().map(|t| t.is_dir()).unwrap_or(false);
        if !is_dir {
            continue;
        }

        let name = entry.file_name();
        let Some(date) = name.to_str().and_then(parse_partition_date) else {
            continue;
        };

        if date < cutoff {
            let path = entry.path();
            match fs::remove_dir_all(&path) {
                Ok(()) => {
                    debug!(path = %path.display(), "Removed expired log partition");
                    removed += 1;
                }
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "Failed to remove expired log partition");
                }
            }
        }
    }

    Ok(removed)
}

/// Handle to control the running sweeper
///
/// Dropping the handle stops the sweeper as well.
#[derive(Debug)]
pub struct SweeperHandle {
    shutdown_tx: Option<oneshot::Sender<()>>,
}

impl SweeperHandle {
    /// Stop the sweeper after its current cycle
    pub fn shutdown(mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            // Ignore error if the task already exited
            let _ = tx.send(());
        }
    }
}

/// Start the periodic sweeper
///
/// Runs on the current Tokio runtime when there is one, otherwise on a
/// dedicated thread with its own runtime. Returns `None` when the retention
/// window disables sweeping or the thread cannot be started.
pub fn spawn_sweeper(
    base_dir: PathBuf,
    retention_days: i64,
    clock: Arc<dyn Clock>,
    period: Duration,
) -> Option<SweeperHandle> {
    if retention_days <= 0 {
        return None;
    }

    let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
    let task = run_sweeper(base_dir, retention_days, clock, period, shutdown_rx);

    if let Ok(handle) = tokio::runtime::Handle::try_current() {
        handle.spawn(task);
    } else {
        let spawned = std::thread::Builder::new()
            .name("daylog-sweeper".to_string())
            .spawn(move || {
                match tokio::runtime::Builder::new_current_thread()
                    .enable_time()
                    .build()
                {
                    Ok(runtime) => runtime.block_on(task),
                    Err(e) => warn!(error = %e, "Failed to build retention sweeper runtime"),
                }
            });
        if let Err(e) = spawned {
            warn!(error = %e, "Failed to start retention sweeper thread");
            return None;
        }
    }

    info!(retention_days, "Retention sweeper started");
    Some(SweeperHandle {
        shutdown_tx: Some(shutdown_tx),
    })
}

async fn run_sweeper(
    base_dir: PathBuf,
    retention_days: i64,
    clock: Arc<dyn Clock>,
    period: Duration,
    mut shutdown_rx: oneshot::Receiver<()>,
) {
    let mut ticker = tokio::time::interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = &mut shutdown_rx => {
                debug!("Retention sweeper shutting down");
                break;
            }
            _ = ticker.tick() => {
                let dir = base_dir.clone();
                let today = clock.now().date();
                let result = tokio::task::spawn_blocking(move || {
                    sweep_expired(&dir, retention_days, today)
                })
                .await;

                match result {
                    Ok(Ok(0)) => {}
                    Ok(Ok(count)) => info!("Cleaned up {} expired log directories", count),
                    // Skip this cycle and retry on the next tick
                    Ok(Err(e)) => warn!(error = %e, "Retention sweep skipped"),
                    Err(e) => warn!(error = %e, "Retention sweep task failed"),
                }
            }
        }
    }
}
