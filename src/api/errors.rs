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
use tracing::warn;

use crate::input::FetchError;
use crate::vision::ClassifyError;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ErrorResponse {
    pub error_type: String,
    pub message: String,
    pub details: Option<HashMap<String, serde_json::Value>>,
}

#[derive(Debug, Clone)]
pub enum ApiError {
    InvalidRequest(String),
    ValidationError {
        field: String,
        message: String,
    },
    /// Image could not be decoded or its background could not be removed
    UnprocessableImage {
        kind: &'static str,
        message: String,
    },
    /// URL image could not be retrieved
    FetchFailed(String),
    ServiceUnavailable(String),
    InternalError {
        kind: &'static str,
        message: String,
    },
}

impl ApiError {
    pub fn to_response(&self) -> ErrorResponse {
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
            ApiError::UnprocessableImage { kind, message } => (*kind, message.clone(), None),
            ApiError::FetchFailed(msg) => ("fetch_error", msg.clone(), None),
            ApiError::ServiceUnavailable(msg) => ("service_unavailable", msg.clone(), None),
            ApiError::InternalError { kind, message } => (*kind, message.clone(), None),
        };

        ErrorResponse {
            error_type: error_type.to_string(),
            message,
            details,
        }
    }

    pub fn status_code(&self) -> u16 {
        match self {
            ApiError::InvalidRequest(_)
            | ApiError::ValidationError { .. }
            | ApiError::UnprocessableImage { .. } => 400,
            ApiError::FetchFailed(_) => 502,
            ApiError::ServiceUnavailable(_) => 503,
            ApiError::InternalError { .. } => 500,
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
            ApiError::UnprocessableImage { message, .. } => {
                write!(f, "Could not process image: {}", message)
            }
            ApiError::FetchFailed(msg) => write!(f, "Could not fetch image: {}", msg),
            ApiError::ServiceUnavailable(msg) => write!(f, "Service unavailable: {}", msg),
            ApiError::InternalError { message, .. } => write!(f, "Internal error: {}", message),
        }
    }
}

impl std::error::Error for ApiError {}

/// Status mapping only; `FruitClassifier::classify` has already logged the failure
impl From<ClassifyError> for ApiError {
    fn from(err: ClassifyError) -> Self {
        let kind = err.kind();
        match err {
            ClassifyError::InvalidImage(_) | ClassifyError::Segmentation(_) => {
                ApiError::UnprocessableImage {
                    kind,
                    message: err.to_string(),
                }
            }
            ClassifyError::ArtifactLoad(_) => ApiError::ServiceUnavailable(err.to_string()),
            ClassifyError::Inference(_)
            | ClassifyError::LabelIndex { .. }
            | ClassifyError::LabelWidth { .. } => ApiError::InternalError {
                kind,
                message: err.to_string(),
            },
        }
    }
}

impl From<FetchError> for ApiError {
    fn from(err: FetchError) -> Self {
        match err {
            FetchError::InvalidUrl(url) => {
                warn!("Rejected image URL: {}", url);
                ApiError::ValidationError {
                    field: "url".to_string(),
                    message: format!("url must be an http or https URL, got '{}'", url),
                }
            }
            other => {
                warn!("Image fetch failed: {}", other);
                ApiError::FetchFailed(other.to_string())
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status =
            StatusCode::from_u16(self.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        (status, Json(self.to_response())).into_response()
    }
}
