//! Events delivered by the positioning and motion-sensor producers

/// Provider identifier of the satellite positioning source
pub const GPS_PROVIDER: &str = "gps";

/// A positioning fix
#[derive(Debug, Clone, PartialEq)]
pub struct PositionFix {
    /// Identifier of the provider that produced the fix
    pub provider: String,
    /// UTC time of the fix in milliseconds since the Unix epoch
    pub time_millis: i64,
    /// Latitude in degrees
    pub latitude: f64,
    /// Longitude in degrees
    pub longitude: f64,
    /// Altitude in meters above the WGS84 ellipsoid
    pub altitude: f64,
    /// Estimated horizontal accuracy radius in meters
    pub accuracy: f32,
}

impl PositionFix {
    /// Create a fix reported by the satellite positioning provider
    pub fn gps(time_millis: i64, latitude: f64, longitude: f64, altitude: f64, accuracy: f32) -> Self {
        Self {
            provider: GPS_PROVIDER.to_string(),
            time_millis,
            latitude,
            longitude,
            altitude,
            accuracy,
        }
    }
}

/// Kind of motion sensor that produced a sample
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SensorType {
    Accelerometer,
    Gyroscope,
    /// A sensor this logger does not record
    Other(i32),
}

impl SensorType {
    const ACCELEROMETER_ID: i32 = 1;
    const GYROSCOPE_ID: i32 = 4;

    /// Map a platform sensor type id
    pub fn from_id(id: i32) -> Self {
        match id {
            Self::ACCELEROMETER_ID => SensorType::Accelerometer,
            Self::GYROSCOPE_ID => SensorType::Gyroscope,
            other => SensorType::Other(other),
        }
    }
}

/// A motion-sensor sample
#[derive(Debug, Clone, PartialEq)]
pub struct MotionSample {
    pub sensor_type: SensorType,
    /// Per-axis readings (x, y, z and any extra components)
    pub values: Vec<f32>,
    /// Sensor timestamp in nanoseconds
    pub timestamp_nanos: i64,
}

impl MotionSample {
    pub fn new(sensor_type: SensorType, values: Vec<f32>, timestamp_nanos: i64) -> Self {
        Self {
            sensor_type,
            values,
            timestamp_nanos,
        }
    }
}
