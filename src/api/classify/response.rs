// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Classification response types

use serde::{Deserialize, Serialize};

use crate::vision::PredictionResult;

/// Response from fruit classification
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassifyResponse {
    /// Predicted fruit name
    pub label: String,
    /// Truncated confidence percentage (0-100)
    pub confidence: u8,
    /// Processing time in milliseconds
    pub processing_time_ms: u64,
    /// Model used for classification
    pub model: String,
    /// Where the image came from ("file" or "url")
    pub source: String,
}

impl ClassifyResponse {
    pub fn new(prediction: PredictionResult, processing_time_ms: u64, model: &str, source: &str) -> Self {
        Self {
            label: prediction.label,
            confidence: prediction.confidence,
            processing_time_ms,
            model: model.to_string(),
            source: source.to_string(),
        }
    }
}
