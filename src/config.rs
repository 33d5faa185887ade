use std::env;
use std::str::FromStr;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct Config {
    // Backend API
    pub api_base_url: String,
    pub api_token: Option<String>,
    pub admin_username: Option<String>,
    pub admin_password: Option<String>,
    pub http_timeout_seconds: u64,

    // Simulation settings
    pub simulation_interval_ms: u64,
    pub simulation_autostart: bool,
    pub live_buffer_capacity: usize,

    // Trends settings
    pub trends_region_id: i32,
    pub trends_refresh_seconds: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_base_url: "http://localhost:8000".to_string(),
            api_token: None,
            admin_username: None,
            admin_password: None,
            http_timeout_seconds: 30,
            simulation_interval_ms: 3000,
            simulation_autostart: true,
            live_buffer_capacity: 50,
            trends_region_id: 1,
            trends_refresh_seconds: 30,
        }
    }
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// Unparseable numeric values fall back to their defaults.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` if a value parses but cannot be used
    /// (zero intervals, zero capacity, half-configured credentials).
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let defaults = Self::default();
        let config = Self {
            // Backend API
            api_base_url: env::var("AQI_API_BASE_URL")
                .map(|url| url.trim_end_matches('/').to_string())
                .unwrap_or(defaults.api_base_url),
            api_token: optional_var("AQI_API_TOKEN"),
            admin_username: optional_var("AQI_ADMIN_USERNAME"),
            admin_password: optional_var("AQI_ADMIN_PASSWORD"),
            http_timeout_seconds: parsed_var("HTTP_TIMEOUT_SECONDS", defaults.http_timeout_seconds),

            // Simulation settings
            simulation_interval_ms: parsed_var(
                "SIMULATION_INTERVAL_MS",
                defaults.simulation_interval_ms,
            ),
            simulation_autostart: parsed_var("SIMULATION_AUTOSTART", defaults.simulation_autostart),
            live_buffer_capacity: parsed_var("LIVE_BUFFER_CAPACITY", defaults.live_buffer_capacity),

            // Trends settings
            trends_region_id: parsed_var("TRENDS_REGION_ID", defaults.trends_region_id),
            trends_refresh_seconds: parsed_var(
                "TRENDS_REFRESH_SECONDS",
                defaults.trends_refresh_seconds,
            ),
        };

        config.validate()?;
        Ok(config)
    }

    /// Check cross-field constraints.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` naming the offending variable.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.simulation_interval_ms == 0 {
            return Err(ConfigError::Invalid("SIMULATION_INTERVAL_MS", "must be positive"));
        }
        if self.trends_refresh_seconds == 0 {
            return Err(ConfigError::Invalid("TRENDS_REFRESH_SECONDS", "must be positive"));
        }
        if self.live_buffer_capacity == 0 {
            return Err(ConfigError::Invalid("LIVE_BUFFER_CAPACITY", "must be positive"));
        }
        if self.admin_username.is_some() != self.admin_password.is_some() {
            return Err(ConfigError::Invalid(
                "AQI_ADMIN_USERNAME",
                "username and password must be set together",
            ));
        }
        Ok(())
    }

    #[must_use]
    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_seconds)
    }

    #[must_use]
    pub fn simulation_interval(&self) -> Duration {
        Duration::from_millis(self.simulation_interval_ms)
    }

    #[must_use]
    pub fn trends_refresh_interval(&self) -> Duration {
        Duration::from_secs(self.trends_refresh_seconds)
    }

    /// Login credentials, when both halves are configured.
    #[must_use]
    pub fn credentials(&self) -> Option<(&str, &str)> {
        match (&self.admin_username, &self.admin_password) {
            (Some(user), Some(pass)) => Some((user.as_str(), pass.as_str())),
            _ => None,
        }
    }
}

fn optional_var(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn parsed_var<T: FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for environment variable {0}: {1}")]
    Invalid(&'static str, &'static str),
}
