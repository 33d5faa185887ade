use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize, de};

/// Sensor row from `GET /admin/sensors`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sensor {
    pub sensor_id: i32,
    pub sensor_code: String,
    pub region_id: i32,
    pub latitude: f64,
    pub longitude: f64,
    pub radius: f64,
    pub is_active: bool,
}

/// Form for `POST /admin/sensor`, sent as query parameters
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NewSensor {
    pub sensor_code: String,
    pub region_id: i32,
    pub latitude: f64,
    pub longitude: f64,
    /// Coverage radius in kilometers
    pub radius: u32,
}

impl NewSensor {
    #[must_use]
    pub fn new(sensor_code: impl Into<String>, latitude: f64, longitude: f64) -> Self {
        Self {
            sensor_code: sensor_code.into(),
            region_id: 1,
            latitude,
            longitude,
            radius: 20,
        }
    }

    /// Reject forms the backend would store as nonsense.
    ///
    /// # Errors
    ///
    /// Returns a message naming the first invalid field.
    pub fn validate(&self) -> Result<(), String> {
        if self.sensor_code.trim().is_empty() {
            return Err("sensor code is required".to_string());
        }
        if self.region_id <= 0 {
            return Err(format!("region id must be positive, got {}", self.region_id));
        }
        if !(-90.0..=90.0).contains(&self.latitude) {
            return Err(format!("latitude {} is out of range", self.latitude));
        }
        if !(-180.0..=180.0).contains(&self.longitude) {
            return Err(format!("longitude {} is out of range", self.longitude));
        }
        if self.radius == 0 {
            return Err("radius must be positive".to_string());
        }
        Ok(())
    }
}

/// Body of `POST /predict`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PredictRequest {
    pub sensor_id: i32,
    #[serde(rename = "PM2_5")]
    pub pm2_5: f64,
    #[serde(rename = "PM10")]
    pub pm10: f64,
    #[serde(rename = "NO2")]
    pub no2: f64,
    #[serde(rename = "CO")]
    pub co: f64,
    #[serde(rename = "SO2")]
    pub so2: f64,
    #[serde(rename = "O3")]
    pub o3: f64,
    #[serde(rename = "NH3")]
    pub nh3: f64,
    pub hour: u32,
    pub day: u32,
    pub month: u32,
    /// Sunday = 0
    pub weekday: u32,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Prediction {
    #[serde(rename = "predicted_AQI")]
    pub predicted_aqi: f64,
    pub category: String,
}

/// One row of `GET /history/{region_id}`
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct HistoryRecord {
    #[serde(deserialize_with = "deserialize_timestamp")]
    pub timestamp: DateTime<Utc>,
    pub aqi: f64,
    #[serde(default)]
    pub pm25: Option<f64>,
    #[serde(default)]
    pub pm10: Option<f64>,
}

/// Response from `GET /forecast/{region_id}`.
///
/// The backend answers `{"error": "..."}` instead of a value when it has too
/// few readings to forecast from.
#[derive(Debug, Clone, Deserialize)]
pub struct ForecastResponse {
    #[serde(rename = "next_hour_AQI", default)]
    pub next_hour_aqi: Option<f64>,
    #[serde(default)]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoginResponse {
    pub access_token: String,
}

/// Acknowledgement body of the admin mutation endpoints
#[derive(Debug, Clone, Deserialize)]
pub struct MessageResponse {
    pub message: String,
    #[serde(default)]
    pub sensor_id: Option<i32>,
}

/// Parse a backend timestamp. Naive values (no offset) are taken as UTC.
#[must_use]
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
        .map(|naive| naive.and_utc())
}

fn deserialize_timestamp<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    parse_timestamp(&raw).ok_or_else(|| de::Error::custom(format!("invalid timestamp: {raw}")))
}
