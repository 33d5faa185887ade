use chrono::{DateTime, Datelike, Local, Timelike, Utc};
use rand::Rng;
use serde::Serialize;

use crate::api::{PredictRequest, Prediction};
use crate::simulation::{Pollutants, SimulatedSensor};

// Ambient conditions are fixed for every simulated reading.
pub const AMBIENT_TEMPERATURE: f64 = 30.0;
pub const AMBIENT_HUMIDITY: f64 = 60.0;
pub const AMBIENT_WIND_SPEED: f64 = 10.0;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SimulatedReading {
    pub sensor_id: i32,
    pub region_name: String,
    #[serde(flatten)]
    pub pollutants: Pollutants,
    pub temperature: f64,
    pub humidity: f64,
    pub wind_speed: f64,
    pub timestamp: DateTime<Utc>,
}

impl SimulatedReading {
    pub fn generate<R: Rng + ?Sized>(
        sensor: &SimulatedSensor,
        rng: &mut R,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            sensor_id: sensor.sensor_id,
            region_name: sensor.region.to_string(),
            pollutants: sensor.level.ranges().sample(rng),
            temperature: AMBIENT_TEMPERATURE,
            humidity: AMBIENT_HUMIDITY,
            wind_speed: AMBIENT_WIND_SPEED,
            timestamp,
        }
    }

    /// Prediction request for this reading, with calendar features taken
    /// from the reading's timestamp in local time.
    #[must_use]
    pub fn predict_request(&self) -> PredictRequest {
        let calendar = CalendarFeatures::of(&self.timestamp.with_timezone(&Local));
        let p = &self.pollutants;
        PredictRequest {
            sensor_id: self.sensor_id,
            pm2_5: p.pm2_5,
            pm10: p.pm10,
            no2: p.no2,
            co: p.co,
            so2: p.so2,
            o3: p.o3,
            nh3: p.nh3,
            hour: calendar.hour,
            day: calendar.day,
            month: calendar.month,
            weekday: calendar.weekday,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CalendarFeatures {
    pub hour: u32,
    pub day: u32,
    /// 1 = January
    pub month: u32,
    /// 0 = Sunday
    pub weekday: u32,
}

impl CalendarFeatures {
    pub fn of<T: Datelike + Timelike>(moment: &T) -> Self {
        Self {
            hour: moment.hour(),
            day: moment.day(),
            month: moment.month(),
            weekday: moment.weekday().num_days_from_sunday(),
        }
    }
}

/// A simulated reading together with the backend's verdict on it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoredReading {
    #[serde(flatten)]
    pub reading: SimulatedReading,
    pub aqi: f64,
    pub category: String,
}

impl ScoredReading {
    #[must_use]
    pub fn new(reading: SimulatedReading, prediction: Prediction) -> Self {
        Self {
            reading,
            aqi: prediction.predicted_aqi,
            category: prediction.category,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::simulation::{ROSTER, SeverityLevel};
    use chrono::{NaiveDate, TimeZone};
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    #[test]
    fn calendar_features_use_sunday_zero() {
        // 2025-03-02 was a Sunday
        let sunday = NaiveDate::from_ymd_opt(2025, 3, 2)
            .unwrap()
            .and_hms_opt(14, 5, 0)
            .unwrap();
        let features = CalendarFeatures::of(&sunday);
        assert_eq!(
            features,
            CalendarFeatures {
                hour: 14,
                day: 2,
                month: 3,
                weekday: 0
            }
        );

        let saturday = sunday - chrono::Duration::days(1);
        assert_eq!(CalendarFeatures::of(&saturday).weekday, 6);
    }

    #[test]
    fn generated_reading_carries_sensor_and_ambient_fields() {
        let sensor = ROSTER[15];
        let at = Utc.with_ymd_and_hms(2025, 6, 1, 8, 0, 0).unwrap();
        let reading = SimulatedReading::generate(&sensor, &mut StdRng::seed_from_u64(1), at);

        assert_eq!(reading.sensor_id, 16);
        assert_eq!(reading.region_name, "Chandrapur");
        assert_eq!(reading.temperature, 30.0);
        assert_eq!(reading.humidity, 60.0);
        assert_eq!(reading.wind_speed, 10.0);
        assert!(SeverityLevel::Severe.ranges().contains(&reading.pollutants));

        let request = reading.predict_request();
        assert_eq!(request.sensor_id, 16);
        assert_eq!(request.pm2_5, reading.pollutants.pm2_5);
        assert_eq!(request.nh3, reading.pollutants.nh3);
        assert!((1..=12).contains(&request.month));
        assert!(request.weekday < 7);
    }

    #[test]
    fn scored_reading_flattens_for_display() {
        let sensor = ROSTER[0];
        let reading = SimulatedReading::generate(&sensor, &mut StdRng::seed_from_u64(3), Utc::now());
        let scored = ScoredReading::new(
            reading,
            Prediction {
                predicted_aqi: 212.4,
                category: "Poor".to_string(),
            },
        );

        let value = serde_json::to_value(&scored).unwrap();
        assert_eq!(value["sensor_id"], 1);
        assert_eq!(value["region_name"], "Mumbai");
        assert_eq!(value["aqi"], 212.4);
        assert_eq!(value["category"], "Poor");
        assert!(value["PM2_5"].is_number());
    }
}
