// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! End-to-end fruit classification: background removal, then prediction

use image::DynamicImage;
use std::sync::Arc;
use tracing::{error, info, warn};

use super::background::{BackgroundNormalizer, BorderSegmenter, OnnxSegmenter, Segmenter};
use super::error::ClassifyError;
use super::image_utils::decode_image_bytes_with_limit;
use super::model_store::{LoadedModel, ModelSpec, ModelStore};
use super::pipeline::{predict, PredictionResult};
use crate::config::AppConfig;

/// Classifier facade shared by the HTTP server and the CLI
#[derive(Debug)]
pub struct FruitClassifier {
    store: Arc<ModelStore>,
    spec: ModelSpec,
    normalizer: Option<BackgroundNormalizer>,
    max_image_bytes: usize,
}

impl FruitClassifier {
    pub fn new(
        store: Arc<ModelStore>,
        spec: ModelSpec,
        normalizer: Option<BackgroundNormalizer>,
    ) -> Self {
        Self {
            store,
            spec,
            normalizer,
            max_image_bytes: super::image_utils::MAX_IMAGE_SIZE,
        }
    }

    pub fn with_max_image_bytes(mut self, max_image_bytes: usize) -> Self {
        self.max_image_bytes = max_image_bytes;
        self
    }

    /// Build the classifier described by `config`
    ///
    /// The classifier itself loads lazily; only the segmentation model (when
    /// configured) is loaded here.
    pub fn from_config(config: &AppConfig) -> Result<Self, ClassifyError> {
        let spec = config.model_spec().map_err(ClassifyError::ArtifactLoad)?;
        let store = Arc::new(ModelStore::onnx(config.intra_threads));

        let normalizer = if config.remove_background {
            let segmenter: Arc<dyn Segmenter> = match &config.segmentation_model_path {
                Some(path) => Arc::new(OnnxSegmenter::load(path, config.intra_threads)?),
                None => Arc::new(BorderSegmenter::new(config.segmentation_tolerance)),
            };
            Some(BackgroundNormalizer::new(segmenter))
        } else {
            None
        };

        Ok(Self::new(store, spec, normalizer).with_max_image_bytes(config.max_image_bytes))
    }

    pub fn spec(&self) -> &ModelSpec {
        &self.spec
    }

    pub fn store(&self) -> &Arc<ModelStore> {
        &self.store
    }

    /// Model name reported to clients (artifact file stem)
    pub fn model_name(&self) -> String {
        self.spec
            .model_path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("classifier")
            .to_string()
    }

    pub fn removes_background(&self) -> bool {
        self.normalizer.is_some()
    }

    pub fn is_ready(&self) -> bool {
        self.store.is_loaded(&self.spec)
    }

    /// Load the model ahead of the first request
    pub fn warm_up(&self) -> Result<Arc<LoadedModel>, ClassifyError> {
        self.store.load(&self.spec)
    }

    /// Class labels in index order
    pub fn labels(&self) -> Result<Vec<String>, ClassifyError> {
        let model = self.store.load(&self.spec)?;
        Ok(model.labels.iter().map(|(_, l)| l.to_string()).collect())
    }

    /// Normalize the background (when enabled) and predict
    ///
    /// The outcome is logged here, once per call: failures a user can fix
    /// at `warn`, the rest at `error`.
    pub fn classify(&self, image: &DynamicImage) -> Result<PredictionResult, ClassifyError> {
        log_outcome(self.run(image))
    }

    /// Decode raw upload or download bytes, then classify
    pub fn classify_bytes(&self, bytes: &[u8]) -> Result<PredictionResult, ClassifyError> {
        let result = decode_image_bytes_with_limit(bytes, self.max_image_bytes)
            .map_err(ClassifyError::from)
            .and_then(|(image, _info)| self.run(&image));
        log_outcome(result)
    }

    fn run(&self, image: &DynamicImage) -> Result<PredictionResult, ClassifyError> {
        match &self.normalizer {
            Some(normalizer) => normalizer
                .remove_background(image)
                .and_then(|cleaned| predict(&self.store, &self.spec, &cleaned)),
            None => predict(&self.store, &self.spec, image),
        }
    }
}

fn log_outcome(
    result: Result<PredictionResult, ClassifyError>,
) -> Result<PredictionResult, ClassifyError> {
    match &result {
        Ok(prediction) => info!(
            "Classified image as '{}' ({}%)",
            prediction.label, prediction.confidence
        ),
        Err(e) if e.is_user_recoverable() => warn!("Could not process image: {}", e),
        Err(e) => error!("Classification failed [{}]: {}", e.kind(), e),
    }
    result
}
