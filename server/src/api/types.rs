//! Shared API types

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;

use crate::data::{BrokerError, StoreError};
use crate::domain::validation::{ValidationError, ValidationIssue};

/// Standard API error response
#[derive(Debug)]
pub enum ApiError {
    BadRequest { message: String },
    Unauthorized { message: String },
    NotFound { message: String },
    Validation { issues: Vec<ValidationIssue> },
    Internal { message: String },
}

impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::BadRequest {
            message: message.into(),
        }
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::Unauthorized {
            message: message.into(),
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound {
            message: message.into(),
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    pub fn from_store(e: StoreError) -> Self {
        tracing::error!(error = %e, "store error");
        Self::Internal {
            message: "database operation failed".to_string(),
        }
    }
}

impl From<ValidationError> for ApiError {
    fn from(e: ValidationError) -> Self {
        Self::Validation { issues: e.issues }
    }
}

impl From<BrokerError> for ApiError {
    fn from(e: BrokerError) -> Self {
        match e {
            BrokerError::NoTopics => Self::bad_request(e.to_string()),
            other => Self::internal(other.to_string()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, body) = match self {
            Self::BadRequest { message } => (
                StatusCode::BAD_REQUEST,
                serde_json::json!({ "error": message }),
            ),
            Self::Unauthorized { message } => (
                StatusCode::UNAUTHORIZED,
                serde_json::json!({ "error": message }),
            ),
            Self::NotFound { message } => (
                StatusCode::NOT_FOUND,
                serde_json::json!({ "error": message }),
            ),
            Self::Validation { issues } => (
                StatusCode::BAD_REQUEST,
                serde_json::json!({ "error": "validation error", "issues": issues }),
            ),
            Self::Internal { message } => (
                StatusCode::INTERNAL_SERVER_ERROR,
                serde_json::json!({ "error": message }),
            ),
        };
        (status, Json(body)).into_response()
    }
}
