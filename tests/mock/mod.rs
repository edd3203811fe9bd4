// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! In-process stand-ins for model artifacts, shared by the integration tests

#![allow(dead_code)]

use fruit_classifier::vision::{
    ArtifactLoader, Classifier, ClassifyError, InputSpec, LabelIndex, LoadedModel, ModelSpec,
    ModelStore, Preprocessing,
};
use image::{DynamicImage, ImageFormat, Rgb, RgbImage};
use ndarray::{Array2, Array4};
use std::io::Cursor;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

pub const FRUITS: &[&str] = &["Apple", "Banana", "Cherry", "Kiwi"];

type Scorer = Arc<dyn Fn(&Array4<f32>) -> Vec<f32> + Send + Sync>;

/// Classifier whose output is computed by a closure over the input batch
pub struct StubClassifier {
    input_spec: InputSpec,
    scorer: Scorer,
    pub calls: AtomicUsize,
}

impl StubClassifier {
    pub fn new(input_spec: InputSpec, scorer: Scorer) -> Self {
        Self {
            input_spec,
            scorer,
            calls: AtomicUsize::new(0),
        }
    }
}

impl Classifier for StubClassifier {
    fn name(&self) -> String {
        "stub".to_string()
    }

    fn input_spec(&self) -> InputSpec {
        self.input_spec
    }

    fn num_classes(&self) -> Option<usize> {
        None
    }

    fn predict_batch(&self, batch: &Array4<f32>) -> Result<Array2<f32>, ClassifyError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let expected = self.input_spec.batch_shape();
        if batch.shape() != expected {
            return Err(ClassifyError::Inference(format!(
                "shape {:?} != {:?}",
                batch.shape(),
                expected
            )));
        }
        let probs = (self.scorer)(batch);
        let width = probs.len();
        Array2::from_shape_vec((1, width), probs)
            .map_err(|e| ClassifyError::Inference(e.to_string()))
    }
}

/// Loader that counts disk reads and hands out a stub classifier
pub struct StubLoader {
    input_shape: Vec<i64>,
    scorer: Scorer,
    labels: Vec<String>,
    delay: Duration,
    pub loads: AtomicUsize,
}

impl StubLoader {
    pub fn new(scorer: Scorer) -> Self {
        Self {
            input_shape: vec![1, 16, 16, 3],
            scorer,
            labels: FRUITS.iter().map(|s| s.to_string()).collect(),
            delay: Duration::ZERO,
            loads: AtomicUsize::new(0),
        }
    }

    /// Always predicts `class` with probability `p`, the rest spread evenly
    pub fn fixed(class: usize, p: f32) -> Self {
        let n = FRUITS.len();
        Self::new(Arc::new(move |_| {
            let rest = (1.0 - p) / (n - 1) as f32;
            (0..n).map(|i| if i == class { p } else { rest }).collect()
        }))
    }

    /// Predicts Banana when the top-left pixel is white, Apple otherwise
    pub fn white_corner_detector() -> Self {
        Self::new(Arc::new(|batch| {
            if batch[[0, 0, 0, 0]] >= 254.0 {
                vec![0.05, 0.85, 0.05, 0.05]
            } else {
                vec![0.85, 0.05, 0.05, 0.05]
            }
        }))
    }

    pub fn with_input_shape(mut self, shape: &[i64]) -> Self {
        self.input_shape = shape.to_vec();
        self
    }

    pub fn with_labels(mut self, labels: &[&str]) -> Self {
        self.labels = labels.iter().map(|s| s.to_string()).collect();
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn load_count(&self) -> usize {
        self.loads.load(Ordering::SeqCst)
    }
}

impl ArtifactLoader for StubLoader {
    fn load(&self, spec: &ModelSpec) -> Result<LoadedModel, ClassifyError> {
        self.loads.fetch_add(1, Ordering::SeqCst);
        std::thread::sleep(self.delay);

        let input_spec = InputSpec::from_shape(&self.input_shape)?;
        Ok(LoadedModel {
            spec: spec.clone(),
            classifier: Arc::new(StubClassifier::new(input_spec, self.scorer.clone())),
            labels: LabelIndex::new(self.labels.clone())?,
        })
    }
}

/// Raw preprocessing keeps pixel values observable by the stub scorers
pub fn raw_spec() -> ModelSpec {
    ModelSpec::new("models/resnet50_fruits.onnx", "models/labels.json", Preprocessing::Raw)
}

pub fn store_with(loader: Arc<StubLoader>) -> Arc<ModelStore> {
    Arc::new(ModelStore::new(loader))
}

/// A square "fruit" in the middle of a solid backdrop
pub fn fruit_on_backdrop(size: u32, fruit: [u8; 3], backdrop: [u8; 3]) -> DynamicImage {
    let inset = size / 4;
    DynamicImage::ImageRgb8(RgbImage::from_fn(size, size, |x, y| {
        if x >= inset && x < size - inset && y >= inset && y < size - inset {
            Rgb(fruit)
        } else {
            Rgb(backdrop)
        }
    }))
}

pub fn encode(image: &DynamicImage, format: ImageFormat) -> Vec<u8> {
    let mut buffer = Cursor::new(Vec::new());
    image.write_to(&mut buffer, format).unwrap();
    buffer.into_inner()
}
