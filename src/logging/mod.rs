//! Diagnostic logging for gnsslog
//!
//! Diagnostics go through `tracing` into timestamped files under
//! `~/.gnsslog/logs`, separate from the telemetry files themselves.

mod file_writer;

pub use file_writer::{
    cleanup_old_logs, cleanup_old_logs_with_retention, create_log_file_path, init_file_logging,
    LogFileInfo, LoggingGuard, DEFAULT_RETENTION_DAYS,
};
