use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Result};
use tokio::io::BufReader;

use gnsslog::config::{self, Config};
use gnsslog::logging;
use gnsslog::replay;
use gnsslog::status::{Severity, StatusSink, TracingSink};
use gnsslog::storage::DirectoryStorage;
use gnsslog::telemetry::{FileFactory, LoggerOptions, TelemetryLogger};

const USAGE: &str = "Usage: gnsslog [record|sweep|init-config]";

#[tokio::main]
async fn main() -> Result<()> {
    config::ensure_directories()?;

    // Initialize diagnostics BEFORE any tracing calls
    let (log_file_info, _guard) = logging::init_file_logging(config::logs_dir())?;

    if let Ok(count) = logging::cleanup_old_logs(&config::logs_dir()) {
        if count > 0 {
            tracing::info!("Cleaned up {} old diagnostic logs", count);
        }
    }
    tracing::info!("Diagnostics logging to: {}", log_file_info.path.display());

    let config = Config::load()?;
    let command = std::env::args().nth(1);

    match command.as_deref() {
        None | Some("record") => record(config).await,
        Some("sweep") => {
            let logger = build_logger(&config);
            let report = logger.sweep()?;
            println!(
                "Removed {} undersized and {} excess files from {}",
                report.undersized,
                report.evicted,
                logger.base_dir().display()
            );
            Ok(())
        }
        Some("init-config") => {
            config.save()?;
            println!("Wrote {}", config::config_file_path().display());
            Ok(())
        }
        Some(other) => bail!("Unknown command '{}'. {}", other, USAGE),
    }
}

/// Status sink for the terminal: prints and records every notification
struct ConsoleSink;

impl StatusSink for ConsoleSink {
    fn notify(&self, message: &str, severity: Severity) {
        eprintln!("[{}] {}", severity.as_str(), message);
        TracingSink.notify(message, severity);
    }
}

fn build_logger(config: &Config) -> TelemetryLogger {
    let storage = Arc::new(DirectoryStorage::new(config.storage_root_path()));
    TelemetryLogger::new(
        FileFactory::new(storage),
        Arc::new(ConsoleSink),
        LoggerOptions::from(config),
    )
}

/// Log events from stdin until EOF or Ctrl-C
async fn record(config: Config) -> Result<()> {
    let logger = Arc::new(build_logger(&config));

    if let Err(e) = logger.sweep() {
        tracing::warn!("Startup sweep failed: {:#}", e);
    }

    let report = logger.start();
    if report.opened().is_empty() {
        bail!("No log channel could be opened");
    }

    let sweeper = (config.sweep_interval_secs > 0).then(|| {
        let logger = Arc::clone(&logger);
        let period = Duration::from_secs(config.sweep_interval_secs);
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
            // The first tick completes immediately
            interval.tick().await;
            loop {
                interval.tick().await;
                let logger = Arc::clone(&logger);
                match tokio::task::spawn_blocking(move || logger.sweep()).await {
                    Ok(Err(e)) => tracing::warn!("Periodic sweep failed: {:#}", e),
                    Err(e) => tracing::warn!("Periodic sweep task failed: {}", e),
                    Ok(Ok(_)) => {}
                }
            }
        })
    });

    let stdin = BufReader::new(tokio::io::stdin());
    tokio::select! {
        result = replay::replay(stdin, Arc::clone(&logger)) => {
            let stats = result?;
            tracing::info!(
                delivered = stats.delivered,
                malformed = stats.malformed,
                "Event stream ended"
            );
        }
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("Interrupted, stopping session");
        }
    }

    if let Some(handle) = sweeper {
        handle.abort();
    }

    let status = logger.status();
    logger.stop()?;
    eprintln!(
        "Logged {} positioning and {} motion records",
        status.positioning.records_written, status.motion.records_written
    );
    Ok(())
}
