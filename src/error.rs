use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use std::path::PathBuf;
use thiserror::Error;

/// Application error types
#[derive(Error, Debug)]
pub enum AppError {
    /// A required dataset column is absent
    #[error("Dataset is missing required column '{column}'")]
    MissingColumn { column: String },

    /// A feature column has zero variance, so the scaler cannot be fitted
    #[error("Feature column '{column}' has zero variance")]
    DegenerateFeature { column: String },

    /// A categorical value was never observed during training
    #[error("Unknown category '{value}' for column '{column}'")]
    UnknownCategory { column: String, value: String },

    /// The artifact bundle directory or one of its artifacts is missing
    #[error("Artifact bundle not found at {path:?}")]
    BundleNotFound { path: PathBuf },

    /// An artifact exists but cannot be decoded
    #[error("Corrupt artifact bundle at {path:?}: {reason}")]
    CorruptBundle { path: PathBuf, reason: String },

    /// A retraining run is already in flight
    #[error("A training run is already in progress")]
    TrainingInProgress,

    /// Malformed dataset contents (parse failures, empty input, bad labels)
    #[error("Dataset error: {0}")]
    Dataset(String),

    /// Validation errors on inference requests
    #[error("Validation error: {0}")]
    Validation(String),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Internal errors
    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Get HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::MissingColumn { .. } => StatusCode::BAD_REQUEST,
            AppError::DegenerateFeature { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::UnknownCategory { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::BundleNotFound { .. } => StatusCode::SERVICE_UNAVAILABLE,
            AppError::CorruptBundle { .. } => StatusCode::SERVICE_UNAVAILABLE,
            AppError::TrainingInProgress => StatusCode::CONFLICT,
            AppError::Dataset(_) => StatusCode::BAD_REQUEST,
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::Configuration(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Serialization(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Get error code string
    pub fn error_code(&self) -> &str {
        match self {
            AppError::MissingColumn { .. } => "MISSING_COLUMN",
            AppError::DegenerateFeature { .. } => "DEGENERATE_FEATURE",
            AppError::UnknownCategory { .. } => "UNKNOWN_CATEGORY",
            AppError::BundleNotFound { .. } => "BUNDLE_NOT_FOUND",
            AppError::CorruptBundle { .. } => "CORRUPT_BUNDLE",
            AppError::TrainingInProgress => "TRAINING_IN_PROGRESS",
            AppError::Dataset(_) => "DATASET_ERROR",
            AppError::Validation(_) => "VALIDATION_ERROR",
            AppError::Configuration(_) => "CONFIGURATION_ERROR",
            AppError::Io(_) => "IO_ERROR",
            AppError::Serialization(_) => "SERIALIZATION_ERROR",
            AppError::Internal(_) => "INTERNAL_ERROR",
        }
    }
}

/// Convert AppError to HTTP response
impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let error_code = self.error_code();
        let message = self.to_string();

        tracing::error!(
            error_code = error_code,
            status_code = status.as_u16(),
            message = %message,
            "Request error"
        );

        let body = Json(json!({
            "error": {
                "code": error_code,
                "message": message,
                "status": status.as_u16(),
            }
        }));

        (status, body).into_response()
    }
}

/// Conversion from serde_json::Error
impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::Serialization(err.to_string())
    }
}

/// Conversion from config::ConfigError
impl From<config::ConfigError> for AppError {
    fn from(err: config::ConfigError) -> Self {
        AppError::Configuration(err.to_string())
    }
}

/// Result type alias
pub type Result<T> = std::result::Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_status_codes() {
        assert_eq!(
            AppError::MissingColumn {
                column: "COUNTRY".to_string()
            }
            .status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            AppError::UnknownCategory {
                column: "COUNTRY".to_string(),
                value: "Mali".to_string()
            }
            .status_code(),
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(
            AppError::TrainingInProgress.status_code(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            AppError::BundleNotFound {
                path: PathBuf::from("/tmp/models")
            }
            .status_code(),
            StatusCode::SERVICE_UNAVAILABLE
        );
    }

    #[test]
    fn test_error_codes() {
        assert_eq!(
            AppError::DegenerateFeature {
                column: "rainfall_mm".to_string()
            }
            .error_code(),
            "DEGENERATE_FEATURE"
        );
        assert_eq!(
            AppError::TrainingInProgress.error_code(),
            "TRAINING_IN_PROGRESS"
        );
    }

    #[test]
    fn test_error_messages_carry_context() {
        let err = AppError::UnknownCategory {
            column: "ADMIN1".to_string(),
            value: "Gao".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("ADMIN1"));
        assert!(msg.contains("Gao"));
    }
}
