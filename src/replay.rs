//! Text event replay
//!
//! Feeds recorded producer events into a [`TelemetryLogger`]. One event per line:
//!
//! ```text
//! fix,<provider>,<timeMillis>,<latitude>,<longitude>,<altitude>,<accuracy>
//! imu,<accel|gyro|sensorTypeId>,<timestampNanos>,<x>,<y>,<z>[,...]
//! ```
//!
//! Blank lines and lines starting with `#` are skipped.
//!
//! Appends do blocking file I/O, so events are handed to a consumer on the
//! blocking pool and the async side only reads and parses.

use std::sync::Arc;

use anyhow::{anyhow, bail, Context, Result};
use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tokio::sync::mpsc;

use crate::telemetry::{MotionSample, PositionFix, SensorType, TelemetryLogger};

/// A producer event parsed from text
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    Location(PositionFix),
    Sensor(MotionSample),
}

/// Counters from a replay run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReplayStats {
    /// Events handed to the logger
    pub delivered: usize,
    /// Lines that could not be parsed
    pub malformed: usize,
}

/// Parse one event line; `Ok(None)` for blanks and comments
pub fn parse_event(line: &str) -> Result<Option<Event>> {
    let line = line.trim();
    if line.is_empty() || line.starts_with('#') {
        return Ok(None);
    }

    let fields: Vec<&str> = line.split(',').map(str::trim).collect();
    match fields[0] {
        "fix" => parse_fix(&fields[1..]).map(|fix| Some(Event::Location(fix))),
        "imu" => parse_sample(&fields[1..]).map(|sample| Some(Event::Sensor(sample))),
        other => bail!("Unknown event kind: {}", other),
    }
}

fn parse_fix(fields: &[&str]) -> Result<PositionFix> {
    let [provider, time, lat, lon, alt, acc] = fields else {
        bail!("fix expects 6 fields, got {}", fields.len());
    };
    Ok(PositionFix {
        provider: provider.to_string(),
        time_millis: time.parse().context("Invalid fix time")?,
        latitude: lat.parse().context("Invalid latitude")?,
        longitude: lon.parse().context("Invalid longitude")?,
        altitude: alt.parse().context("Invalid altitude")?,
        accuracy: acc.parse().context("Invalid accuracy")?,
    })
}

fn parse_sample(fields: &[&str]) -> Result<MotionSample> {
    let (sensor, rest) = fields
        .split_first()
        .ok_or_else(|| anyhow!("imu event is missing the sensor type"))?;
    let (timestamp, axes) = rest
        .split_first()
        .ok_or_else(|| anyhow!("imu event is missing the timestamp"))?;

    let sensor_type = match *sensor {
        "accel" => SensorType::Accelerometer,
        "gyro" => SensorType::Gyroscope,
        id => SensorType::from_id(id.parse().context("Invalid sensor type")?),
    };
    let values = axes
        .iter()
        .map(|v| v.parse::<f32>().context("Invalid axis value"))
        .collect::<Result<Vec<_>>>()?;

    Ok(MotionSample::new(
        sensor_type,
        values,
        timestamp.parse().context("Invalid sensor timestamp")?,
    ))
}

/// Deliver a single event to the logger
///
/// Logger failures have already been reported to its status sink, so they are
/// not propagated.
pub fn deliver(logger: &TelemetryLogger, event: &Event) {
    let _ = match event {
        Event::Location(fix) => logger.on_location(fix),
        Event::Sensor(sample) => logger.on_sensor(sample),
    };
}

/// Capacity of the queue between the reader and the delivery thread
const EVENT_QUEUE_CAPACITY: usize = 1024;

/// Read events from `reader` until EOF and deliver them to `logger`
///
/// Returns once every parsed event has been delivered.
pub async fn replay<R>(reader: R, logger: Arc<TelemetryLogger>) -> Result<ReplayStats>
where
    R: AsyncBufRead + Unpin,
{
    let (tx, mut rx) = mpsc::channel::<Event>(EVENT_QUEUE_CAPACITY);
    let consumer = tokio::task::spawn_blocking(move || {
        let mut delivered: usize = 0;
        while let Some(event) = rx.blocking_recv() {
            deliver(&logger, &event);
            delivered += 1;
        }
        delivered
    });

    let mut malformed = 0;
    let mut lines = reader.lines();
    while let Some(line) = lines.next_line().await.context("Failed to read event stream")? {
        match parse_event(&line) {
            Ok(Some(event)) => {
                if tx.send(event).await.is_err() {
                    bail!("Event delivery thread stopped");
                }
            }
            Ok(None) => {}
            Err(e) => {
                tracing::warn!(line = %line, error = %e, "Skipping malformed event");
                malformed += 1;
            }
        }
    }
    drop(tx);

    let delivered = consumer.await.context("Event delivery thread failed")?;
    Ok(ReplayStats {
        delivered,
        malformed,
    })
}
