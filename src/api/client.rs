use reqwest::{Client, RequestBuilder};
use serde::de::DeserializeOwned;
use std::sync::{Arc, PoisonError, RwLock};

use crate::api::models::{
    ForecastResponse, HistoryRecord, LoginResponse, MessageResponse, NewSensor, PredictRequest,
    Prediction, Sensor,
};
use crate::api::{Predictor, SensorStore, TrendSource};
use crate::config::Config;
use crate::error::{AppError, AppResult};

/// Bearer token of the signed-in admin.
#[derive(Debug, Default)]
pub struct Session {
    token: RwLock<Option<String>>,
}

impl Session {
    #[must_use]
    pub fn new(token: Option<String>) -> Self {
        Self {
            token: RwLock::new(token),
        }
    }

    #[must_use]
    pub fn token(&self) -> Option<String> {
        self.token
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn set_token(&self, token: String) {
        *self.token.write().unwrap_or_else(PoisonError::into_inner) = Some(token);
    }

    /// Drop the token. Subsequent admin requests go out unauthenticated.
    pub fn logout(&self) {
        *self.token.write().unwrap_or_else(PoisonError::into_inner) = None;
    }

    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.token
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }
}

pub struct ApiClient {
    http_client: Client,
    base_url: String,
    session: Arc<Session>,
}

impl ApiClient {
    /// Build a client from configuration, seeding the session with
    /// `AQI_API_TOKEN` when set.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Internal` if the HTTP client cannot be constructed.
    pub fn new(config: &Config) -> AppResult<Self> {
        let http_client = Client::builder()
            .timeout(config.http_timeout())
            .build()
            .map_err(|e| AppError::Internal(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            http_client,
            base_url: config.api_base_url.trim_end_matches('/').to_string(),
            session: Arc::new(Session::new(config.api_token.clone())),
        })
    }

    #[must_use]
    pub fn session(&self) -> Arc<Session> {
        Arc::clone(&self.session)
    }

    /// Exchange admin credentials for a bearer token and keep it in the session.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Unauthorized` on bad credentials, `AppError::Api`
    /// for any other failure.
    pub async fn login(&self, username: &str, password: &str) -> AppResult<()> {
        let url = format!("{}/admin/login", self.base_url);
        let request = self
            .http_client
            .post(&url)
            .form(&[("username", username), ("password", password)]);

        let body: LoginResponse = self.send(request).await?;
        self.session.set_token(body.access_token);
        tracing::info!(username, "Admin session established");
        Ok(())
    }

    /// Attach the session token, send, and decode a JSON body.
    async fn send<T: DeserializeOwned>(&self, request: RequestBuilder) -> AppResult<T> {
        let request = match self.session.token() {
            Some(token) => request.bearer_auth(token),
            None => request,
        };

        let response = request
            .send()
            .await
            .map_err(|e| AppError::Api(format!("Request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::from_status(status, &body));
        }

        let text = response
            .text()
            .await
            .map_err(|e| AppError::Api(format!("Failed to get response text: {e}")))?;

        serde_json::from_str(&text).map_err(|e| {
            tracing::error!(
                error = %e,
                body_preview = %text.chars().take(500).collect::<String>(),
                "Failed to parse backend response"
            );
            AppError::Api(format!("Failed to parse response: {e}"))
        })
    }
}

impl Predictor for ApiClient {
    async fn predict(&self, request: &PredictRequest) -> AppResult<Prediction> {
        let url = format!("{}/predict", self.base_url);
        self.send(self.http_client.post(&url).json(request)).await
    }
}

impl TrendSource for ApiClient {
    async fn history(&self, region_id: i32) -> AppResult<Vec<HistoryRecord>> {
        let url = format!("{}/history/{region_id}", self.base_url);
        self.send(self.http_client.get(&url)).await
    }

    async fn forecast(&self, region_id: i32) -> AppResult<Option<f64>> {
        let url = format!("{}/forecast/{region_id}", self.base_url);
        let body: ForecastResponse = self.send(self.http_client.get(&url)).await?;

        if let Some(reason) = &body.error {
            tracing::debug!(region_id, reason = %reason, "Backend returned no forecast");
        }

        Ok(body.next_hour_aqi.filter(|v| v.is_finite()))
    }
}

impl SensorStore for ApiClient {
    async fn list_sensors(&self) -> AppResult<Vec<Sensor>> {
        let url = format!("{}/admin/sensors", self.base_url);
        self.send(self.http_client.get(&url)).await
    }

    async fn create_sensor(&self, sensor: &NewSensor) -> AppResult<Option<i32>> {
        let url = format!("{}/admin/sensor", self.base_url);
        let body: MessageResponse = self.send(self.http_client.post(&url).query(sensor)).await?;
        tracing::debug!(message = %body.message, sensor_id = ?body.sensor_id, "Sensor created");
        Ok(body.sensor_id)
    }

    async fn set_sensor_status(&self, sensor_id: i32, is_active: bool) -> AppResult<()> {
        let url = format!("{}/admin/sensor/{sensor_id}/status", self.base_url);
        let _: MessageResponse = self
            .send(self.http_client.put(&url).query(&[("is_active", is_active)]))
            .await?;
        Ok(())
    }

    async fn delete_sensor(&self, sensor_id: i32) -> AppResult<()> {
        let url = format!("{}/admin/sensor/{sensor_id}", self.base_url);
        let _: MessageResponse = self.send(self.http_client.delete(&url)).await?;
        Ok(())
    }
}
