//! Backend API access.
//!
//! The traits here are the seams the simulator, the trend aggregator and the
//! sensor registry talk through. [`ApiClient`] implements all of them over
//! HTTP; tests substitute in-memory fakes.

pub mod client;
pub mod models;

use std::future::Future;

pub use client::{ApiClient, Session};
pub use models::{
    HistoryRecord, NewSensor, PredictRequest, Prediction, Sensor, parse_timestamp,
};

use crate::error::AppResult;

/// Scores a pollutant reading.
pub trait Predictor: Send + Sync + 'static {
    fn predict(&self, request: &PredictRequest)
    -> impl Future<Output = AppResult<Prediction>> + Send;
}

/// Historical and forecast AQI for a region.
pub trait TrendSource: Send + Sync + 'static {
    fn history(&self, region_id: i32) -> impl Future<Output = AppResult<Vec<HistoryRecord>>> + Send;

    /// Next-hour forecast, `None` when the backend has nothing to offer.
    fn forecast(&self, region_id: i32) -> impl Future<Output = AppResult<Option<f64>>> + Send;
}

/// Sensor persistence behind the admin endpoints.
pub trait SensorStore: Send + Sync {
    fn list_sensors(&self) -> impl Future<Output = AppResult<Vec<Sensor>>> + Send;

    /// Returns the id assigned to the new sensor, when the backend reports it.
    fn create_sensor(&self, sensor: &NewSensor) -> impl Future<Output = AppResult<Option<i32>>> + Send;

    fn set_sensor_status(&self, sensor_id: i32, is_active: bool)
    -> impl Future<Output = AppResult<()>> + Send;

    fn delete_sensor(&self, sensor_id: i32) -> impl Future<Output = AppResult<()>> + Send;
}

impl<T: SensorStore> SensorStore for &T {
    fn list_sensors(&self) -> impl Future<Output = AppResult<Vec<Sensor>>> + Send {
        (**self).list_sensors()
    }

    fn create_sensor(&self, sensor: &NewSensor) -> impl Future<Output = AppResult<Option<i32>>> + Send {
        (**self).create_sensor(sensor)
    }

    fn set_sensor_status(&self, sensor_id: i32, is_active: bool)
    -> impl Future<Output = AppResult<()>> + Send {
        (**self).set_sensor_status(sensor_id, is_active)
    }

    fn delete_sensor(&self, sensor_id: i32) -> impl Future<Output = AppResult<()>> + Send {
        (**self).delete_sensor(sensor_id)
    }
}
