use reqwest::StatusCode;

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Backend API error: {0}")]
    Api(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Configuration error: {0}")]
    Config(#[from] crate::config::ConfigError),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Map a non-success HTTP status from the backend to an error.
    ///
    /// 401 is the only status with its own recovery path (forced logout).
    #[must_use]
    pub fn from_status(status: StatusCode, body: &str) -> Self {
        match status {
            StatusCode::UNAUTHORIZED => Self::Unauthorized(body.to_string()),
            StatusCode::NOT_FOUND => Self::NotFound(body.to_string()),
            _ => Self::Api(format!("HTTP {status}: {body}")),
        }
    }

    #[must_use]
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, Self::Unauthorized(_))
    }
}

pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ConfigError;

    #[test]
    fn status_mapping() {
        assert!(AppError::from_status(StatusCode::UNAUTHORIZED, "expired").is_unauthorized());
        assert!(matches!(
            AppError::from_status(StatusCode::NOT_FOUND, ""),
            AppError::NotFound(_)
        ));

        let err = AppError::from_status(StatusCode::INTERNAL_SERVER_ERROR, "boom");
        assert!(!err.is_unauthorized());
        assert_eq!(
            err.to_string(),
            "Backend API error: HTTP 500 Internal Server Error: boom"
        );
    }

    #[test]
    fn config_error_converts() {
        let err = AppError::from(ConfigError::Invalid("LIVE_BUFFER_CAPACITY", "must be positive"));
        assert!(matches!(err, AppError::Config(_)));
        assert!(!err.is_unauthorized());
        assert!(err.to_string().starts_with("Configuration error: "));
    }
}
