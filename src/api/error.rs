use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

use crate::error::PredictorError;

/// API error types that can be returned from handlers
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{message}")]
    Validation {
        field: Option<String>,
        message: String,
    },

    #[error("Unknown inverter: {0}")]
    UnknownInverter(String),

    #[error("Model unavailable: {0}")]
    ModelUnavailable(String),

    #[error("Internal server error: {0}")]
    InternalError(String),
}

/// Error response that gets serialized to JSON
#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: String,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    field: Option<String>,
}

impl ApiError {
    /// Get the HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::Validation { .. } => StatusCode::BAD_REQUEST,
            ApiError::UnknownInverter(_) => StatusCode::NOT_FOUND,
            ApiError::ModelUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::InternalError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Get the error type string
    pub fn error_type(&self) -> &'static str {
        match self {
            ApiError::Validation { .. } => "ValidationError",
            ApiError::UnknownInverter(_) => "UnknownInverter",
            ApiError::ModelUnavailable(_) => "ModelUnavailable",
            ApiError::InternalError(_) => "InternalServerError",
        }
    }

    pub fn field(&self) -> Option<&str> {
        match self {
            ApiError::Validation { field, .. } => field.as_deref(),
            ApiError::UnknownInverter(_) => Some("inverter_id"),
            _ => None,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        let message = match &self {
            ApiError::InternalError(_) => {
                tracing::error!(error = %self, "API error occurred");
                "An internal error occurred".to_string()
            }
            ApiError::ModelUnavailable(_) => {
                tracing::warn!(error = %self, "Model unavailable");
                self.to_string()
            }
            _ => {
                tracing::debug!(error = %self, "Client error");
                self.to_string()
            }
        };

        let error_response = ErrorResponse {
            error: self.error_type().to_string(),
            message,
            field: self.field().map(str::to_string),
        };

        (status, Json(error_response)).into_response()
    }
}

impl From<PredictorError> for ApiError {
    fn from(error: PredictorError) -> Self {
        match error {
            PredictorError::Validation { field, .. } => ApiError::Validation {
                field: Some(field.to_string()),
                message: error.to_string(),
            },
            PredictorError::UnknownCategory(id) => ApiError::UnknownInverter(id),
            PredictorError::ArtifactNotFound(_) | PredictorError::ArtifactCorrupt { .. } => {
                ApiError::ModelUnavailable(error.to_string())
            }
            other => ApiError::InternalError(other.to_string()),
        }
    }
}

impl From<validator::ValidationErrors> for ApiError {
    fn from(errors: validator::ValidationErrors) -> Self {
        let field = errors.field_errors().keys().next().map(|f| f.to_string());
        ApiError::Validation {
            field,
            message: errors.to_string(),
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        let message = rejection.body_text();
        ApiError::Validation {
            field: missing_field(&message).map(str::to_string),
            message,
        }
    }
}

/// Field named by serde's "missing field `x`" message
fn missing_field(message: &str) -> Option<&str> {
    let rest = &message[message.find("missing field `")? + "missing field `".len()..];
    rest.split('`').next().filter(|f| !f.is_empty())
}
