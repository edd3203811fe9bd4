// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Classification request types and validation

use serde::{Deserialize, Serialize};

use crate::api::errors::ApiError;
use crate::input::{ImageFetcher, InputSource};
use crate::vision::decode_base64_bytes;

/// Request for classifying one image, given inline or by URL
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassifyRequest {
    /// Base64-encoded image data (a `data:` URL is accepted)
    #[serde(default)]
    pub image: Option<String>,

    /// http/https URL of the image
    #[serde(default)]
    pub url: Option<String>,
}

fn is_blank(value: &Option<String>) -> bool {
    value.as_deref().map(|s| s.trim().is_empty()).unwrap_or(true)
}

impl ClassifyRequest {
    /// Validate the classification request
    pub fn validate(&self, max_image_bytes: usize) -> Result<(), ApiError> {
        match (is_blank(&self.image), is_blank(&self.url)) {
            (true, true) => {
                return Err(ApiError::ValidationError {
                    field: "image".to_string(),
                    message: "either image or url is required".to_string(),
                })
            }
            (false, false) => {
                return Err(ApiError::ValidationError {
                    field: "image".to_string(),
                    message: "provide either image or url, not both".to_string(),
                })
            }
            _ => {}
        }

        // Base64 inflates by 4/3
        if let Some(ref image) = self.image {
            let limit = max_image_bytes / 3 * 4 + 4;
            if image.len() > limit {
                return Err(ApiError::ValidationError {
                    field: "image".to_string(),
                    message: format!("image exceeds maximum size of {} bytes", max_image_bytes),
                });
            }
        }

        if let Some(ref url) = self.url {
            if !is_blank(&self.url) {
                ImageFetcher::validate_url(url)?;
            }
        }

        Ok(())
    }

    /// Convert into the selected input source
    pub fn into_source(self) -> Result<InputSource, ApiError> {
        let mut source = InputSource::default();
        if let Some(image) = self.image.filter(|s| !s.trim().is_empty()) {
            let bytes = decode_base64_bytes(&image).map_err(|e| ApiError::ValidationError {
                field: "image".to_string(),
                message: e.to_string(),
            })?;
            source.upload_file(bytes);
        } else if let Some(url) = self.url {
            source.enter_url(&url);
        }
        Ok(source)
    }
}
