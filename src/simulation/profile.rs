//! Severity profiles for synthetic pollutant readings.
//!
//! Each profile maps the seven pollutants the prediction model consumes to a
//! half-open `[min, max)` concentration band. Generation draws every
//! pollutant independently and uniformly from its band.

use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::Range;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SeverityLevel {
    Low,
    Good,
    Moderate,
    High,
    VeryHigh,
    Severe,
}

impl SeverityLevel {
    pub const ALL: [Self; 6] = [
        Self::Low,
        Self::Good,
        Self::Moderate,
        Self::High,
        Self::VeryHigh,
        Self::Severe,
    ];

    /// Parse a profile label. Anything unrecognised is treated as `severe`.
    #[must_use]
    pub fn from_label(label: &str) -> Self {
        match label.trim().to_lowercase().as_str() {
            "low" => Self::Low,
            "good" => Self::Good,
            "moderate" => Self::Moderate,
            "high" => Self::High,
            "very_high" => Self::VeryHigh,
            _ => Self::Severe,
        }
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Good => "good",
            Self::Moderate => "moderate",
            Self::High => "high",
            Self::VeryHigh => "very_high",
            Self::Severe => "severe",
        }
    }

    #[must_use]
    pub fn ranges(self) -> PollutantRanges {
        match self {
            Self::Low => PollutantRanges {
                pm2_5: 5.0..15.0,
                pm10: 15.0..40.0,
                no2: 5.0..15.0,
                co: 0.1..0.4,
                so2: 2.0..8.0,
                o3: 10.0..25.0,
                nh3: 2.0..8.0,
            },
            Self::Good => PollutantRanges {
                pm2_5: 15.0..40.0,
                pm10: 40.0..80.0,
                no2: 10.0..25.0,
                co: 0.3..0.8,
                so2: 5.0..15.0,
                o3: 20.0..50.0,
                nh3: 5.0..15.0,
            },
            Self::Moderate => PollutantRanges {
                pm2_5: 40.0..100.0,
                pm10: 80.0..200.0,
                no2: 25.0..60.0,
                co: 0.7..1.8,
                so2: 10.0..30.0,
                o3: 40.0..80.0,
                nh3: 10.0..30.0,
            },
            Self::High => PollutantRanges {
                pm2_5: 100.0..220.0,
                pm10: 200.0..400.0,
                no2: 60.0..120.0,
                co: 1.5..3.0,
                so2: 20.0..60.0,
                o3: 60.0..120.0,
                nh3: 20.0..60.0,
            },
            Self::VeryHigh => PollutantRanges {
                pm2_5: 180.0..300.0,
                pm10: 350.0..550.0,
                no2: 90.0..180.0,
                co: 2.5..5.0,
                so2: 40.0..100.0,
                o3: 80.0..160.0,
                nh3: 40.0..100.0,
            },
            Self::Severe => PollutantRanges {
                pm2_5: 300.0..500.0,
                pm10: 500.0..800.0,
                no2: 150.0..300.0,
                co: 5.0..10.0,
                so2: 80.0..200.0,
                o3: 150.0..250.0,
                nh3: 80.0..150.0,
            },
        }
    }
}

impl fmt::Display for SeverityLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PollutantRanges {
    pub pm2_5: Range<f64>,
    pub pm10: Range<f64>,
    pub no2: Range<f64>,
    pub co: Range<f64>,
    pub so2: Range<f64>,
    pub o3: Range<f64>,
    pub nh3: Range<f64>,
}

impl PollutantRanges {
    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> Pollutants {
        Pollutants {
            pm2_5: rng.random_range(self.pm2_5.clone()),
            pm10: rng.random_range(self.pm10.clone()),
            no2: rng.random_range(self.no2.clone()),
            co: rng.random_range(self.co.clone()),
            so2: rng.random_range(self.so2.clone()),
            o3: rng.random_range(self.o3.clone()),
            nh3: rng.random_range(self.nh3.clone()),
        }
    }

    #[must_use]
    pub fn contains(&self, p: &Pollutants) -> bool {
        self.pm2_5.contains(&p.pm2_5)
            && self.pm10.contains(&p.pm10)
            && self.no2.contains(&p.no2)
            && self.co.contains(&p.co)
            && self.so2.contains(&p.so2)
            && self.o3.contains(&p.o3)
            && self.nh3.contains(&p.nh3)
    }
}

/// Concentrations of the seven model inputs
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Pollutants {
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
}

/// Draw one set of pollutant values for a profile label.
pub fn generate_pollutants<R: Rng + ?Sized>(label: &str, rng: &mut R) -> Pollutants {
    SeverityLevel::from_label(label).ranges().sample(rng)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    #[test]
    fn unknown_labels_fall_back_to_severe() {
        assert_eq!(SeverityLevel::from_label("apocalyptic"), SeverityLevel::Severe);
        assert_eq!(SeverityLevel::from_label(""), SeverityLevel::Severe);
        assert_eq!(SeverityLevel::from_label("Very_High"), SeverityLevel::VeryHigh);
    }

    #[test]
    fn labels_round_trip() {
        for level in SeverityLevel::ALL {
            assert_eq!(SeverityLevel::from_label(level.as_str()), level);
        }
    }

    #[test]
    fn same_seed_same_reading() {
        let a = generate_pollutants("moderate", &mut StdRng::seed_from_u64(7));
        let b = generate_pollutants("moderate", &mut StdRng::seed_from_u64(7));
        assert_eq!(a, b);
    }

    #[test]
    fn thousand_readings_per_level_stay_in_band() {
        let mut rng = StdRng::seed_from_u64(2024);
        for label in ["low", "good", "moderate", "high", "very_high", "severe", "unknown"] {
            let ranges = SeverityLevel::from_label(label).ranges();
            for _ in 0..1000 {
                let reading = generate_pollutants(label, &mut rng);
                assert!(ranges.contains(&reading), "{label}: {reading:?}");
            }
        }
    }

    fn any_label() -> impl Strategy<Value = String> {
        prop_oneof![
            Just("low".to_string()),
            Just("good".to_string()),
            Just("moderate".to_string()),
            Just("high".to_string()),
            Just("very_high".to_string()),
            Just("severe".to_string()),
            "[a-z_]{0,12}",
        ]
    }

    proptest! {
        #[test]
        fn generated_values_lie_in_profile_band(label in any_label(), seed in any::<u64>()) {
            let mut rng = StdRng::seed_from_u64(seed);
            let ranges = SeverityLevel::from_label(&label).ranges();
            let reading = generate_pollutants(&label, &mut rng);
            prop_assert!(ranges.contains(&reading));
            prop_assert!(reading.pm2_5 >= ranges.pm2_5.start && reading.pm2_5 < ranges.pm2_5.end);
        }
    }
}
