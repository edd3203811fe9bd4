// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Pretrained image classifier
//!
//! The pipeline only needs two things from a model: its declared input
//! geometry and a batch-predict operation returning one probability vector
//! per image. `OnnxClassifier` provides both on top of ONNX Runtime.

use ndarray::{Array2, Array4, Ix2};
use ort::execution_providers::CPUExecutionProvider;
use ort::session::builder::GraphOptimizationLevel;
use ort::session::Session;
use ort::value::{Value, ValueType};
use std::path::Path;
use std::sync::Mutex;
use tracing::{debug, info};

use super::error::ClassifyError;
use super::preprocessing::InputSpec;

/// A loaded classifier that maps image batches to class probabilities
#[cfg_attr(test, mockall::automock)]
pub trait Classifier: Send + Sync {
    /// Human-readable model name (usually the artifact file stem)
    fn name(&self) -> String;

    /// Input geometry declared by the model
    fn input_spec(&self) -> InputSpec;

    /// Output width, when the model declares it statically
    fn num_classes(&self) -> Option<usize>;

    /// Run inference on a batch, returning a `[batch, classes]` array
    fn predict_batch(&self, batch: &Array4<f32>) -> Result<Array2<f32>, ClassifyError>;
}

/// ONNX Runtime classifier (CPU execution)
pub struct OnnxClassifier {
    /// ONNX Runtime session (thread-safe)
    session: Mutex<Session>,
    /// Model name
    name: String,
    /// Model input name
    input_name: String,
    /// Declared input geometry
    input_spec: InputSpec,
    /// Declared output width
    num_classes: Option<usize>,
}

impl std::fmt::Debug for OnnxClassifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OnnxClassifier")
            .field("name", &self.name)
            .field("input_name", &self.input_name)
            .field("input_spec", &self.input_spec)
            .field("num_classes", &self.num_classes)
            .finish_non_exhaustive()
    }
}

fn tensor_shape(value_type: &ValueType) -> Option<Vec<i64>> {
    match value_type {
        ValueType::Tensor { shape, .. } => Some(shape.iter().copied().collect()),
        _ => None,
    }
}

impl OnnxClassifier {
    /// Load a classifier from an ONNX file
    ///
    /// # Errors
    /// Returns `ArtifactLoad` if:
    /// - Model file not found
    /// - ONNX Runtime cannot deserialize the model
    /// - The declared input is not a 3-channel image tensor
    pub fn load<P: AsRef<Path>>(model_path: P, intra_threads: usize) -> Result<Self, ClassifyError> {
        let model_path = model_path.as_ref();

        if !model_path.exists() {
            return Err(ClassifyError::ArtifactLoad(format!(
                "classifier model not found: {}",
                model_path.display()
            )));
        }

        info!("Loading classifier model from {}", model_path.display());

        let load_err = |stage: &str, e: ort::Error| {
            ClassifyError::ArtifactLoad(format!(
                "{} ({}): {}",
                stage,
                model_path.display(),
                e
            ))
        };

        let session = Session::builder()
            .map_err(|e| load_err("Failed to create session builder", e))?
            .with_execution_providers([CPUExecutionProvider::default().build()])
            .map_err(|e| load_err("Failed to set CPU execution provider", e))?
            .with_optimization_level(GraphOptimizationLevel::Level3)
            .map_err(|e| load_err("Failed to set optimization level", e))?
            .with_intra_threads(intra_threads.max(1))
            .map_err(|e| load_err("Failed to set intra threads", e))?
            .commit_from_file(model_path)
            .map_err(|e| load_err("Failed to load classifier model", e))?;

        let input = session.inputs.first().ok_or_else(|| {
            ClassifyError::ArtifactLoad("classifier model declares no inputs".to_string())
        })?;
        let input_name = input.name.clone();
        let input_shape = tensor_shape(&input.input_type).ok_or_else(|| {
            ClassifyError::ArtifactLoad(format!("classifier input '{}' is not a tensor", input_name))
        })?;
        let input_spec = InputSpec::from_shape(&input_shape)?;

        let num_classes = session
            .outputs
            .first()
            .and_then(|output| tensor_shape(&output.output_type))
            .and_then(|shape| shape.last().copied())
            .filter(|d| *d > 0)
            .map(|d| d as usize);

        let name = model_path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("classifier")
            .to_string();

        debug!(
            "Classifier input '{}' shape {:?}, output classes {:?}",
            input_name, input_shape, num_classes
        );
        info!(
            "✅ Classifier '{}' loaded ({}x{}, {:?})",
            name, input_spec.width, input_spec.height, input_spec.layout
        );

        Ok(Self {
            session: Mutex::new(session),
            name,
            input_name,
            input_spec,
            num_classes,
        })
    }
}

impl Classifier for OnnxClassifier {
    fn name(&self) -> String {
        self.name.clone()
    }

    fn input_spec(&self) -> InputSpec {
        self.input_spec
    }

    fn num_classes(&self) -> Option<usize> {
        self.num_classes
    }

    fn predict_batch(&self, batch: &Array4<f32>) -> Result<Array2<f32>, ClassifyError> {
        let expected = self.input_spec.batch_shape();
        if batch.shape()[1..] != expected[1..] {
            return Err(ClassifyError::Inference(format!(
                "input shape {:?} does not match model input {:?}",
                batch.shape(),
                expected
            )));
        }

        let mut session = self
            .session
            .lock()
            .map_err(|_| ClassifyError::Inference("classifier session lock poisoned".to_string()))?;

        let input_value = Value::from_array(batch.to_owned())?;
        let outputs = session.run(ort::inputs![&self.input_name => input_value])?;

        let probabilities = outputs[0]
            .try_extract_array::<f32>()?
            .into_dimensionality::<Ix2>()
            .map_err(|e| ClassifyError::Inference(format!("unexpected output shape: {}", e)))?
            .to_owned();

        Ok(probabilities)
    }
}
