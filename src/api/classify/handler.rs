// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Classification endpoint handlers

use axum::{extract::State, Json};
use axum_extra::extract::Multipart;
use bytes::Bytes;
use std::time::Instant;
use tracing::{debug, info, warn};

use super::request::ClassifyRequest;
use super::response::ClassifyResponse;
use crate::api::errors::ApiError;
use crate::api::http_server::AppState;
use crate::input::InputSource;

/// POST /v1/classify - Classify a fruit image
///
/// # Request
/// - `image`: Base64-encoded image data
/// - `url`: http/https URL of the image
///
/// Exactly one of the two must be given.
///
/// # Response
/// - `label`: Predicted fruit
/// - `confidence`: Truncated percentage (0-100)
/// - `processingTimeMs`, `model`, `source`
///
/// # Errors
/// JSON `ErrorResponse` bodies with:
/// - 400 Bad Request: invalid request, undecodable image, failed background removal
/// - 502 Bad Gateway: the URL could not be fetched
/// - 503 Service Unavailable: model artifacts could not be loaded
/// - 500 Internal Server Error: inference or label lookup failed
pub async fn classify_handler(
    State(state): State<AppState>,
    Json(request): Json<ClassifyRequest>,
) -> Result<Json<ClassifyResponse>, ApiError> {
    debug!("Classify request received");

    if let Err(e) = request.validate(state.max_image_bytes) {
        warn!("Classify validation failed: {}", e);
        return Err(e);
    }

    let source = request.into_source()?;
    Ok(Json(classify_source(&state, source).await?))
}

/// POST /v1/classify/upload - Classify an image from a multipart form
///
/// Accepts a `file` field and/or a `url` field. Fields are applied in order,
/// so the last one selected wins.
pub async fn classify_upload_handler(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<ClassifyResponse>, ApiError> {
    let mut source = InputSource::default();

    while let Some(field) = multipart.next_field().await.map_err(|e| {
        warn!("Malformed multipart body: {}", e);
        ApiError::InvalidRequest(e.to_string())
    })? {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "file" => {
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| ApiError::InvalidRequest(e.to_string()))?;
                source.upload_file(bytes);
            }
            "url" => {
                let text = field
                    .text()
                    .await
                    .map_err(|e| ApiError::InvalidRequest(e.to_string()))?;
                source.enter_url(&text);
            }
            other => debug!("Ignoring multipart field '{}'", other),
        }
    }

    Ok(Json(classify_source(&state, source).await?))
}

/// Resolve the input to bytes and classify on a blocking thread
async fn classify_source(state: &AppState, source: InputSource) -> Result<ClassifyResponse, ApiError> {
    let started = Instant::now();
    let kind = source.kind();

    let bytes: Bytes = match source {
        InputSource::NoInput => {
            return Err(ApiError::ValidationError {
                field: "file".to_string(),
                message: "upload a file or enter an image URL".to_string(),
            })
        }
        InputSource::File(bytes) => bytes,
        InputSource::Url(url) => state.fetcher.fetch(&url).await?,
    };

    let classifier = state.classifier.clone();
    let prediction = tokio::task::spawn_blocking(move || classifier.classify_bytes(&bytes))
        .await
        .map_err(|e| ApiError::InternalError {
            kind: "internal_error",
            message: format!("classification task failed: {}", e),
        })??;

    let elapsed = started.elapsed().as_millis() as u64;
    info!(
        "Classify complete: '{}' ({}%), {}ms, source {}",
        prediction.label, prediction.confidence, elapsed, kind
    );

    Ok(ClassifyResponse::new(
        prediction,
        elapsed,
        &state.classifier.model_name(),
        kind,
    ))
}
