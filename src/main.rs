use std::path::PathBuf;

use anyhow::{Context, Result};

use daylog::config::{LoggerConfig, DEFAULT_CONFIG_FILE};
use daylog::{field, Logger};

/// Environment variable overriding the config file location
const CONFIG_ENV: &str = "DAYLOG_CONFIG";

#[tokio::main]
async fn main() -> Result<()> {
    // Diagnostics from the logger itself go to stderr
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "daylog=info".into());
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .init();

    let config_path = std::env::var_os(CONFIG_ENV)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE));
    let config = LoggerConfig::load(&config_path)?;

    let logger = Logger::new(config).context("Failed to initialize logger")?;
    logger
        .preopen(&["user", "order"])
        .context("Failed to open log streams")?;

    logger.info("user", "registration", "signup succeeded", &[]);
    logger.debug(
        "order",
        "orders",
        "generating order number",
        &[field("order_id", 1042)],
    );
    logger.error(
        "order",
        "orders",
        "insufficient stock",
        &[field("sku", "A-77"), field("requested", 3)],
    );

    logger.flush_all();
    tracing::info!(
        "Logging to: {}",
        logger.registry().base_dir().join(logger.registry().active_date()).display()
    );

    Ok(())
}
