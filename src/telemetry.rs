use clap::ValueEnum;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::fmt::{Display, Formatter};

use crate::error::FetchError;

/// WGS84 coordinate pair in decimal degrees
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct LatLon {
    pub lat: f64,
    pub lon: f64,
}

impl LatLon {
    pub const fn new(lat: f64, lon: f64) -> Self {
        LatLon { lat, lon }
    }

    /// (0, 0) is what the receiver reports before it has a fix
    pub fn is_no_fix(&self) -> bool {
        self.lat == 0.0 && self.lon == 0.0
    }
}

impl Display for LatLon {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(f, "({}, {})", self.lat, self.lon)
    }
}

/// One telemetry reading. Every field is optional: a missing, `null` or
/// wrong-typed field in the payload is absent here, never zero.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct TelemetrySample {
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub velocity: Option<f64>,
    pub satellites: Option<u32>,
    pub battery: Option<f64>,
    pub connection_status: Option<String>,
    pub timestamp: Option<String>,
}

impl TelemetrySample {
    /// Returns the position if the sample is position-valid: both
    /// coordinates present and numeric, and not the (0, 0) no-fix sentinel.
    pub fn position(&self) -> Option<LatLon> {
        match (self.latitude, self.longitude) {
            (Some(lat), Some(lon)) => {
                let pos = LatLon::new(lat, lon);
                (!pos.is_no_fix()).then_some(pos)
            }
            _ => None,
        }
    }

    /// Raw display value of a field, `None` when absent
    pub fn field_value(&self, field: FieldId) -> Option<String> {
        match field {
            FieldId::Latitude => self.latitude.map(|v| v.to_string()),
            FieldId::Longitude => self.longitude.map(|v| v.to_string()),
            FieldId::Velocity => self.velocity.map(|v| v.to_string()),
            FieldId::Satellites => self.satellites.map(|v| v.to_string()),
            FieldId::Battery => self.battery.map(|v| v.to_string()),
            FieldId::ConnectionStatus => self.connection_status.clone(),
            FieldId::Timestamp => self.timestamp.clone(),
        }
    }
}

/// Status panel fields
#[derive(Clone, Copy, Debug, Hash, Eq, PartialEq, Ord, PartialOrd)]
pub enum FieldId {
    Latitude,
    Longitude,
    Velocity,
    Satellites,
    Battery,
    ConnectionStatus,
    Timestamp,
}

impl FieldId {
    /// Element id used by the web page
    pub fn element_id(&self) -> &'static str {
        match self {
            FieldId::Latitude => "latitude",
            FieldId::Longitude => "longitude",
            FieldId::Velocity => "velocity",
            FieldId::Satellites => "satellites",
            FieldId::Battery => "battery",
            FieldId::ConnectionStatus => "connection-status",
            FieldId::Timestamp => "timestamp",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            FieldId::Latitude => "Latitude",
            FieldId::Longitude => "Longitude",
            FieldId::Velocity => "Velocity",
            FieldId::Satellites => "Satellites",
            FieldId::Battery => "Battery",
            FieldId::ConnectionStatus => "Connection Status",
            FieldId::Timestamp => "Timestamp",
        }
    }

    pub fn is_coordinate(&self) -> bool {
        matches!(self, FieldId::Latitude | FieldId::Longitude)
    }
}

/// Telemetry payload layout served by a deployment.
///
/// The two layouts are never merged: a poller reads only the fields of the
/// schema it was configured with.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Schema {
    /// Bike telemetry: velocity, battery and link status
    Bike,
    /// Raw GPS receiver: velocity in mph, satellites in use, fix time
    Gps,
}

const BIKE_FIELDS: [FieldId; 5] = [
    FieldId::Latitude,
    FieldId::Longitude,
    FieldId::Velocity,
    FieldId::Battery,
    FieldId::ConnectionStatus,
];

const GPS_FIELDS: [FieldId; 5] = [
    FieldId::Latitude,
    FieldId::Longitude,
    FieldId::Velocity,
    FieldId::Satellites,
    FieldId::Timestamp,
];

impl Schema {
    pub fn fields(&self) -> &'static [FieldId] {
        match self {
            Schema::Bike => &BIKE_FIELDS,
            Schema::Gps => &GPS_FIELDS,
        }
    }

    /// Unit suffix appended to a rendered value
    pub fn unit(&self, field: FieldId) -> &'static str {
        match (self, field) {
            (Schema::Gps, FieldId::Latitude | FieldId::Longitude) => "°",
            (Schema::Gps, FieldId::Velocity) => " mph",
            _ => "",
        }
    }

    /// Decode a response body.
    ///
    /// A body that is not JSON is a parse error, a JSON value that is not an
    /// object is a shape error. Inside an object each field is decoded on its
    /// own and a bad field only makes that field absent.
    pub fn decode(&self, body: &[u8]) -> Result<TelemetrySample, FetchError> {
        let value: Value = serde_json::from_slice(body)?;
        if !value.is_object() {
            return Err(FetchError::Shape(format!(
                "expected a JSON object, got {}",
                json_kind(&value)
            )));
        }

        let sample = match self {
            Schema::Bike => serde_json::from_value::<BikeReport>(value).map(TelemetrySample::from),
            Schema::Gps => serde_json::from_value::<GpsReport>(value).map(TelemetrySample::from),
        };
        sample.map_err(|e| FetchError::Shape(e.to_string()))
    }
}

impl Display for Schema {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        match self {
            Schema::Bike => write!(f, "bike"),
            Schema::Gps => write!(f, "gps"),
        }
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[derive(Deserialize)]
struct BikeReport {
    #[serde(default, deserialize_with = "lenient_number")]
    latitude: Option<f64>,
    #[serde(default, deserialize_with = "lenient_number")]
    longitude: Option<f64>,
    #[serde(default, deserialize_with = "lenient_number")]
    velocity: Option<f64>,
    #[serde(default, deserialize_with = "lenient_number")]
    battery: Option<f64>,
    #[serde(default, deserialize_with = "lenient_text")]
    connection_status: Option<String>,
}

impl From<BikeReport> for TelemetrySample {
    fn from(report: BikeReport) -> Self {
        TelemetrySample {
            latitude: report.latitude,
            longitude: report.longitude,
            velocity: report.velocity,
            battery: report.battery,
            connection_status: report.connection_status,
            ..Default::default()
        }
    }
}

#[derive(Deserialize)]
struct GpsReport {
    #[serde(default, deserialize_with = "lenient_number")]
    latitude: Option<f64>,
    #[serde(default, deserialize_with = "lenient_number")]
    longitude: Option<f64>,
    #[serde(default, deserialize_with = "lenient_number")]
    velocity: Option<f64>,
    #[serde(default, deserialize_with = "lenient_count")]
    satellites: Option<u32>,
    #[serde(default, deserialize_with = "lenient_text")]
    timestamp: Option<String>,
}

impl From<GpsReport> for TelemetrySample {
    fn from(report: GpsReport) -> Self {
        TelemetrySample {
            latitude: report.latitude,
            longitude: report.longitude,
            velocity: report.velocity,
            satellites: report.satellites,
            timestamp: report.timestamp,
            ..Default::default()
        }
    }
}

fn lenient_number<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(value.as_f64().filter(|v| v.is_finite()))
}

fn lenient_count<'de, D>(deserializer: D) -> Result<Option<u32>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    let count = match value.as_u64() {
        Some(n) => Some(n),
        // some firmwares send whole floats ("8.0")
        None => value
            .as_f64()
            .filter(|v| *v >= 0.0 && v.fract() == 0.0)
            .map(|v| v as u64),
    };
    Ok(count.and_then(|n| u32::try_from(n).ok()))
}

fn lenient_text<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(value.as_str().map(str::to_owned))
}
