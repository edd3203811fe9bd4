// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Vision processing module for CPU-based fruit classification
//!
//! This module provides:
//! - Background removal (ONNX salient-object model or border flood fill)
//! - Image classification via a pretrained ONNX classifier
//!
//! Models are loaded once per process through `ModelStore`.

pub mod background;
pub mod classifier;
pub mod error;
pub mod image_utils;
pub mod labels;
pub mod model_store;
pub mod pipeline;
pub mod preprocessing;
pub mod service;

pub use background::{
    composite_on_white, BackgroundNormalizer, BorderSegmenter, OnnxSegmenter, Segmenter,
    DEFAULT_BORDER_TOLERANCE,
};
pub use classifier::{Classifier, OnnxClassifier};
pub use error::ClassifyError;
pub use image_utils::{
    decode_base64_bytes, decode_base64_image, decode_image_bytes, detect_format, ImageError,
    ImageInfo,
};
pub use labels::LabelIndex;
pub use model_store::{ArtifactLoader, LoadedModel, ModelSpec, ModelStore, OnnxArtifactLoader};
pub use pipeline::{argmax, confidence_percent, predict, PredictionResult};
pub use preprocessing::{prepare_input, InputSpec, Preprocessing, TensorLayout};
pub use service::FruitClassifier;
