// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

use crate::config::{ModelKind, ModelRegistry, UnknownModelError};
use crate::vision::{ImageError, PipelineError};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ErrorResponse {
    pub error_type: String,
    pub message: String,
    pub request_id: Option<String>,
    pub details: Option<HashMap<String, serde_json::Value>>,
}

#[derive(Debug, Clone)]
pub enum ApiError {
    InvalidRequest(String),
    ValidationError {
        field: String,
        message: String,
    },
    UnsupportedMediaType(String),
    ModelNotFound {
        kind: ModelKind,
        model: String,
        available_models: Vec<String>,
    },
    /// A pipeline stage failed in the model runtime
    StageFailed {
        stage: String,
        message: String,
    },
    ServiceUnavailable(String),
    InternalError(String),
}

impl ApiError {
    /// Registry miss, listing what could have been picked instead
    pub fn unknown_model(err: UnknownModelError, registry: &ModelRegistry) -> Self {
        ApiError::ModelNotFound {
            available_models: registry.list(err.kind),
            kind: err.kind,
            model: err.name,
        }
    }

    pub fn to_response(&self, request_id: Option<String>) -> ErrorResponse {
        let (error_type, message, details) = match self {
            ApiError::InvalidRequest(msg) => ("invalid_request", msg.clone(), None),
            ApiError::ValidationError { field, message } => {
                let mut details = HashMap::new();
                details.insert(
                    "field".to_string(),
                    serde_json::Value::String(field.clone()),
                );
                ("validation_error", message.clone(), Some(details))
            }
            ApiError::UnsupportedMediaType(msg) => ("unsupported_format", msg.clone(), None),
            ApiError::ModelNotFound {
                kind,
                model,
                available_models,
            } => {
                let mut details = HashMap::new();
                details.insert(
                    "kind".to_string(),
                    serde_json::Value::String(kind.to_string()),
                );
                details.insert(
                    "available_models".to_string(),
                    serde_json::Value::Array(
                        available_models
                            .iter()
                            .map(|m| serde_json::Value::String(m.clone()))
                            .collect(),
                    ),
                );
                (
                    "model_not_found",
                    format!("Unknown {} model '{}'", kind, model),
                    Some(details),
                )
            }
            ApiError::StageFailed { stage, message } => {
                let mut details = HashMap::new();
                details.insert(
                    "stage".to_string(),
                    serde_json::Value::String(stage.clone()),
                );
                ("pipeline_error", message.clone(), Some(details))
            }
            ApiError::ServiceUnavailable(msg) => ("service_unavailable", msg.clone(), None),
            ApiError::InternalError(msg) => ("internal_error", msg.clone(), None),
        };

        ErrorResponse {
            error_type: error_type.to_string(),
            message,
            request_id,
            details,
        }
    }

    pub fn status_code(&self) -> u16 {
        match self {
            ApiError::InvalidRequest(_) | ApiError::ValidationError { .. } => 400,
            ApiError::UnsupportedMediaType(_) => 415,
            ApiError::ModelNotFound { .. } => 404,
            ApiError::StageFailed { .. } => 502,
            ApiError::ServiceUnavailable(_) => 503,
            ApiError::InternalError(_) => 500,
        }
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApiError::InvalidRequest(msg) => write!(f, "Invalid request: {}", msg),
            ApiError::ValidationError { field, message } => {
                write!(f, "Validation error for {}: {}", field, message)
            }
            ApiError::UnsupportedMediaType(msg) => write!(f, "Unsupported format: {}", msg),
            ApiError::ModelNotFound { kind, model, .. } => {
                write!(f, "Unknown {} model '{}'", kind, model)
            }
            ApiError::StageFailed { stage, message } => {
                write!(f, "{} failed: {}", stage, message)
            }
            ApiError::ServiceUnavailable(msg) => write!(f, "Service unavailable: {}", msg),
            ApiError::InternalError(msg) => write!(f, "Internal error: {}", msg),
        }
    }
}

impl std::error::Error for ApiError {}

impl From<ImageError> for ApiError {
    fn from(err: ImageError) -> Self {
        match err {
            ImageError::UnsupportedFormat(_) => ApiError::UnsupportedMediaType(err.to_string()),
            ImageError::EmptyData | ImageError::TooLarge(..) | ImageError::DecodeFailed(_) => {
                ApiError::ValidationError {
                    field: "image".to_string(),
                    message: err.to_string(),
                }
            }
            ImageError::EncodeFailed(_) => ApiError::InternalError(err.to_string()),
        }
    }
}

impl From<PipelineError> for ApiError {
    fn from(err: PipelineError) -> Self {
        match err {
            PipelineError::Render(_) => ApiError::InternalError(err.to_string()),
            _ => ApiError::StageFailed {
                stage: err.stage().to_string(),
                message: err.to_string(),
            },
        }
    }
}

/// An [`ApiError`] tagged with the request it belongs to
#[derive(Debug)]
pub struct ApiErrorResponse {
    pub error: ApiError,
    pub request_id: Option<String>,
}

impl ApiErrorResponse {
    pub fn new(error: ApiError, request_id: &str) -> Self {
        Self {
            error,
            request_id: Some(request_id.to_string()),
        }
    }
}

impl From<ApiError> for ApiErrorResponse {
    fn from(error: ApiError) -> Self {
        Self {
            error,
            request_id: None,
        }
    }
}

impl IntoResponse for ApiErrorResponse {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.error.status_code())
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        let body = self.error.to_response(self.request_id);

        (status, Json(body)).into_response()
    }
}
