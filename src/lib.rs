//! gnsslog - dual-channel positioning and motion-sensor file logger
//!
//! Writes positioning fixes and motion-sensor samples from concurrent producers
//! into two timestamp-named text files, and keeps the log directory from
//! filling up with empty or excess files.

pub mod config;
pub mod error;
pub mod logging;
pub mod replay;
pub mod status;
pub mod storage;
pub mod telemetry;

pub use error::LoggerError;
pub use telemetry::TelemetryLogger;
