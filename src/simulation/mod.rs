//! Synthetic sensor traffic for the prediction backend.

pub mod engine;
pub mod profile;
pub mod reading;
pub mod roster;

pub use engine::Simulator;
pub use profile::{PollutantRanges, Pollutants, SeverityLevel, generate_pollutants};
pub use reading::{CalendarFeatures, ScoredReading, SimulatedReading};
pub use roster::{ROSTER, SimulatedSensor, find_sensor};
