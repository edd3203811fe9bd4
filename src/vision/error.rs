// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Error taxonomy for the classification core
//!
//! Every failure in the core surfaces as one of these variants. Nothing is
//! retried automatically; the presentation layer decides what to show.

use thiserror::Error;

use super::image_utils::ImageError;

/// Errors produced by the model store, background normalizer and pipeline
#[derive(Debug, Error)]
pub enum ClassifyError {
    /// Model or label-index artifact is missing, corrupt or incompatible
    #[error("Failed to load model artifacts: {0}")]
    ArtifactLoad(String),

    /// Input image could not be decoded or resized
    #[error("Invalid image: {0}")]
    InvalidImage(String),

    /// Foreground segmentation could not process the input
    #[error("Background removal failed: {0}")]
    Segmentation(String),

    /// The classifier invocation itself failed
    #[error("Inference failed: {0}")]
    Inference(String),

    /// Predicted class index has no entry in the label index
    #[error("Class index {index} is outside the label index (size {size})")]
    LabelIndex { index: usize, size: usize },

    /// Classifier output width differs from the label count
    #[error("Classifier outputs {classes} classes but the label index has {labels} entries")]
    LabelWidth { classes: usize, labels: usize },
}

impl ClassifyError {
    /// Whether supplying a different image can fix this error
    pub fn is_user_recoverable(&self) -> bool {
        matches!(
            self,
            ClassifyError::InvalidImage(_) | ClassifyError::Segmentation(_)
        )
    }

    /// Stable machine-readable name of the variant
    pub fn kind(&self) -> &'static str {
        match self {
            ClassifyError::ArtifactLoad(_) => "artifact_load_error",
            ClassifyError::InvalidImage(_) => "invalid_image_error",
            ClassifyError::Segmentation(_) => "segmentation_error",
            ClassifyError::Inference(_) => "inference_error",
            ClassifyError::LabelIndex { .. } | ClassifyError::LabelWidth { .. } => {
                "label_index_error"
            }
        }
    }
}

impl From<ImageError> for ClassifyError {
    fn from(err: ImageError) -> Self {
        ClassifyError::InvalidImage(err.to_string())
    }
}

impl From<ort::Error> for ClassifyError {
    fn from(err: ort::Error) -> Self {
        ClassifyError::Inference(err.to_string())
    }
}
