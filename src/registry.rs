//! Admin view of the sensor registry.
//!
//! Every successful mutation is followed by a full re-list; the local table
//! is never patched optimistically. A 401 on listing forces a logout; other
//! failures are reported once through the [`Operator`] and leave the table
//! as it was.

use crate::api::{NewSensor, Sensor, SensorStore};
use crate::error::AppError;

/// The person driving the registry.
pub trait Operator {
    /// Ask before a destructive action. `false` aborts it.
    fn confirm(&self, message: &str) -> bool;

    /// Report a failed command.
    fn alert(&self, message: &str);

    /// The session is no longer valid; drop it and return to sign-in.
    fn force_logout(&self);
}

pub const CREATE_FAILED: &str = "Failed to deploy sensor! Check network logs.";
pub const TOGGLE_FAILED: &str = "Failed to update status";
pub const DELETE_FAILED: &str = "Failed to delete sensor";
pub const DELETE_PROMPT: &str = "Are you sure you want to permanently delete this sensor node?";

/// Outcome of a registry command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandOutcome {
    Applied,
    Cancelled,
    Failed,
}

pub struct SensorRegistry<S, O> {
    store: S,
    operator: O,
    sensors: Vec<Sensor>,
}

impl<S: SensorStore, O: Operator> SensorRegistry<S, O> {
    pub fn new(store: S, operator: O) -> Self {
        Self {
            store,
            operator,
            sensors: Vec::new(),
        }
    }

    #[must_use]
    pub fn sensors(&self) -> &[Sensor] {
        &self.sensors
    }

    #[must_use]
    pub fn find(&self, sensor_id: i32) -> Option<&Sensor> {
        self.sensors.iter().find(|s| s.sensor_id == sensor_id)
    }

    #[must_use]
    pub fn operator(&self) -> &O {
        &self.operator
    }

    /// Replace the table with the store's current sensor list.
    pub async fn load(&mut self) -> CommandOutcome {
        match self.store.list_sensors().await {
            Ok(sensors) => {
                tracing::debug!(count = sensors.len(), "Sensor list loaded");
                self.sensors = sensors;
                CommandOutcome::Applied
            }
            Err(AppError::Unauthorized(detail)) => {
                tracing::warn!(detail = %detail, "Session rejected, forcing logout");
                self.sensors.clear();
                self.operator.force_logout();
                CommandOutcome::Failed
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to load sensors");
                CommandOutcome::Failed
            }
        }
    }

    pub async fn create(&mut self, sensor: NewSensor) -> CommandOutcome {
        if let Err(reason) = sensor.validate() {
            tracing::warn!(reason = %reason, "Rejected sensor form");
            self.operator.alert(&format!("Invalid sensor: {reason}"));
            return CommandOutcome::Failed;
        }

        match self.store.create_sensor(&sensor).await {
            Ok(sensor_id) => {
                tracing::info!(sensor_code = %sensor.sensor_code, sensor_id = ?sensor_id, "Sensor deployed");
                self.load().await;
                CommandOutcome::Applied
            }
            Err(e) => {
                tracing::error!(error = %e, sensor_code = %sensor.sensor_code, "Failed to create sensor");
                self.operator.alert(CREATE_FAILED);
                CommandOutcome::Failed
            }
        }
    }

    /// Flip the active flag of a listed sensor.
    pub async fn toggle(&mut self, sensor_id: i32) -> CommandOutcome {
        let Some(current) = self.find(sensor_id).map(|s| s.is_active) else {
            tracing::warn!(sensor_id, "Toggle requested for unknown sensor");
            self.operator.alert(TOGGLE_FAILED);
            return CommandOutcome::Failed;
        };

        match self.store.set_sensor_status(sensor_id, !current).await {
            Ok(()) => {
                tracing::info!(sensor_id, is_active = !current, "Sensor status updated");
                self.load().await;
                CommandOutcome::Applied
            }
            Err(e) => {
                tracing::error!(error = %e, sensor_id, "Failed to update sensor status");
                self.operator.alert(TOGGLE_FAILED);
                CommandOutcome::Failed
            }
        }
    }

    pub async fn delete(&mut self, sensor_id: i32) -> CommandOutcome {
        if !self.operator.confirm(DELETE_PROMPT) {
            tracing::debug!(sensor_id, "Delete cancelled");
            return CommandOutcome::Cancelled;
        }

        match self.store.delete_sensor(sensor_id).await {
            Ok(()) => {
                tracing::info!(sensor_id, "Sensor deleted");
                self.load().await;
                CommandOutcome::Applied
            }
            Err(e) => {
                tracing::error!(error = %e, sensor_id, "Failed to delete sensor");
                self.operator.alert(DELETE_FAILED);
                CommandOutcome::Failed
            }
        }
    }
}
