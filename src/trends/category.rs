use serde::Serialize;
use std::fmt;

/// Backend AQI banding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum AqiCategory {
    Good,
    Satisfactory,
    Moderate,
    Poor,
    VeryPoor,
    Severe,
}

impl AqiCategory {
    #[must_use]
    pub fn from_aqi(aqi: f64) -> Self {
        if aqi <= 50.0 {
            Self::Good
        } else if aqi <= 100.0 {
            Self::Satisfactory
        } else if aqi <= 200.0 {
            Self::Moderate
        } else if aqi <= 300.0 {
            Self::Poor
        } else if aqi <= 400.0 {
            Self::VeryPoor
        } else {
            Self::Severe
        }
    }

    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::Good => "Good",
            Self::Satisfactory => "Satisfactory",
            Self::Moderate => "Moderate",
            Self::Poor => "Poor",
            Self::VeryPoor => "Very Poor",
            Self::Severe => "Severe",
        }
    }
}

impl fmt::Display for AqiCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}
