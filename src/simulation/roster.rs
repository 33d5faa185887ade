use crate::simulation::SeverityLevel::{self, Good, High, Low, Moderate, Severe, VeryHigh};

/// A virtual sensor the simulator reports for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SimulatedSensor {
    pub sensor_id: i32,
    pub region: &'static str,
    pub level: SeverityLevel,
}

impl SimulatedSensor {
    #[must_use]
    pub const fn new(sensor_id: i32, region: &'static str, level: SeverityLevel) -> Self {
        Self {
            sensor_id,
            region,
            level,
        }
    }

    /// Same sensor, generating readings from another profile.
    #[must_use]
    pub fn with_level(self, level: SeverityLevel) -> Self {
        Self { level, ..self }
    }
}

/// Two sensors per region across Maharashtra.
pub const ROSTER: [SimulatedSensor; 20] = [
    SimulatedSensor::new(1, "Mumbai", High),
    SimulatedSensor::new(2, "Mumbai", VeryHigh),
    SimulatedSensor::new(3, "Pune", Moderate),
    SimulatedSensor::new(4, "Pune", High),
    SimulatedSensor::new(5, "Nagpur", Good),
    SimulatedSensor::new(6, "Nagpur", Moderate),
    SimulatedSensor::new(7, "Nashik", Low),
    SimulatedSensor::new(8, "Nashik", Good),
    SimulatedSensor::new(9, "Aurangabad", Moderate),
    SimulatedSensor::new(10, "Aurangabad", High),
    SimulatedSensor::new(11, "Kolhapur", Low),
    SimulatedSensor::new(12, "Kolhapur", Good),
    SimulatedSensor::new(13, "Solapur", High),
    SimulatedSensor::new(14, "Solapur", VeryHigh),
    SimulatedSensor::new(15, "Chandrapur", VeryHigh),
    SimulatedSensor::new(16, "Chandrapur", Severe),
    SimulatedSensor::new(17, "Ratnagiri", Low),
    SimulatedSensor::new(18, "Ratnagiri", Good),
    SimulatedSensor::new(19, "Navi Mumbai", Moderate),
    SimulatedSensor::new(20, "Navi Mumbai", High),
];

#[must_use]
pub fn find_sensor(sensor_id: i32) -> Option<SimulatedSensor> {
    ROSTER.iter().copied().find(|s| s.sensor_id == sensor_id)
}
