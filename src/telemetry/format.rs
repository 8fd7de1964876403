//! Record formatting
//!
//! Each channel has a fixed comma-delimited schema. Numbers are rendered with
//! Rust's formatter, which always uses `.` as the decimal point, so files parse
//! the same regardless of the host locale.

use crate::error::LoggerError;

use super::channel::ChannelKind;
use super::event::{MotionSample, PositionFix, SensorType, GPS_PROVIDER};

pub const RECORD_DELIMITER: char = ',';
pub const COMMENT_START: &str = "# ";
pub const VERSION_TAG: &str = "Version: ";

const POSITION_COLUMNS: &str = "time,lat,lon,alt,accuracy";
const MOTION_COLUMNS: &str = "sensor,timestampNanos,x,y,z";

/// Version string written into file headers
pub fn file_version() -> String {
    format!(
        "{}, Platform: {}",
        env!("CARGO_PKG_VERSION"),
        std::env::consts::OS
    )
}

/// Comment lines written once at the top of a new channel file
pub fn header_lines(channel: ChannelKind) -> Vec<String> {
    let columns = match channel {
        ChannelKind::Positioning => POSITION_COLUMNS,
        ChannelKind::Motion => MOTION_COLUMNS,
    };
    vec![
        format!("{}{}{}", COMMENT_START, VERSION_TAG, file_version()),
        format!("{}{}", COMMENT_START, columns),
    ]
}

/// Render a positioning fix as `time,lat,lon,alt,accuracy`
pub fn format_position(fix: &PositionFix) -> Result<String, LoggerError> {
    let fields = [
        ("latitude", fix.latitude),
        ("longitude", fix.longitude),
        ("altitude", fix.altitude),
        ("accuracy", f64::from(fix.accuracy)),
    ];
    for (name, value) in fields {
        if !value.is_finite() {
            return Err(LoggerError::FormatError {
                channel: ChannelKind::Positioning,
                reason: format!("{} is not finite: {}", name, value),
            });
        }
    }

    Ok(format!(
        "{},{:.6},{:.6},{:.6},{:.6}",
        fix.time_millis, fix.latitude, fix.longitude, fix.altitude, fix.accuracy
    ))
}

/// Render a motion sample as `sensor,timestampNanos,x,y,z`
///
/// Returns `Ok(None)` for sensor types that are not recorded.
pub fn format_motion(sample: &MotionSample) -> Result<Option<String>, LoggerError> {
    let tag = match sample.sensor_type {
        SensorType::Accelerometer => "Accel",
        SensorType::Gyroscope => "Gyro",
        SensorType::Other(_) => return Ok(None),
    };

    let axes = match sample.values.get(..3) {
        Some(axes) => axes,
        None => {
            return Err(LoggerError::FormatError {
                channel: ChannelKind::Motion,
                reason: format!("{} sample has {} axes, expected 3", tag, sample.values.len()),
            })
        }
    };
    if let Some(bad) = axes.iter().find(|v| !v.is_finite()) {
        return Err(LoggerError::FormatError {
            channel: ChannelKind::Motion,
            reason: format!("{} axis is not finite: {}", tag, bad),
        });
    }

    Ok(Some(format!(
        "{},{},{:.6},{:.6},{:.6}",
        tag, sample.timestamp_nanos, axes[0], axes[1], axes[2]
    )))
}

/// Parse a line of a positioning file back into a fix
///
/// Comment lines and malformed lines yield `None`.
pub fn parse_position_line(line: &str) -> Option<PositionFix> {
    let line = line.trim();
    if line.is_empty() || line.starts_with(COMMENT_START.trim_end()) {
        return None;
    }

    let mut parts = line.split(RECORD_DELIMITER);
    let time_millis = parts.next()?.parse().ok()?;
    let latitude = parts.next()?.parse().ok()?;
    let longitude = parts.next()?.parse().ok()?;
    let altitude = parts.next()?.parse().ok()?;
    let accuracy = parts.next()?.parse().ok()?;
    if parts.next().is_some() {
        return None;
    }

    Some(PositionFix {
        provider: GPS_PROVIDER.to_string(),
        time_millis,
        latitude,
        longitude,
        altitude,
        accuracy,
    })
}
