// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Inference pipeline: image in, label and confidence out

use image::DynamicImage;
use ndarray::ArrayView1;
use serde::{Deserialize, Serialize};
use std::time::Instant;
use tracing::{debug, warn};

use super::error::ClassifyError;
use super::model_store::{ModelSpec, ModelStore};
use super::preprocessing::prepare_input;

/// Tolerance on the probability sum before a warning is logged
const PROBABILITY_SUM_TOLERANCE: f32 = 1e-3;

/// Predicted label with its truncated confidence percentage
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PredictionResult {
    pub label: String,
    pub confidence: u8,
}

/// Index of the largest probability; ties go to the lowest index
pub fn argmax(probabilities: ArrayView1<f32>) -> Result<(usize, f32), ClassifyError> {
    let mut best: Option<(usize, f32)> = None;

    for (i, &p) in probabilities.iter().enumerate() {
        if p.is_nan() {
            return Err(ClassifyError::Inference(format!(
                "classifier returned NaN at class {}",
                i
            )));
        }
        match best {
            Some((_, max)) if p <= max => {}
            _ => best = Some((i, p)),
        }
    }

    best.ok_or_else(|| ClassifyError::Inference("classifier returned no classes".to_string()))
}

/// Truncating percentage: 0.995 -> 99, 1.0 -> 100
pub fn confidence_percent(probability: f32) -> u8 {
    (probability * 100.0).floor().clamp(0.0, 100.0) as u8
}

/// Classify a single image with the model identified by `spec`
///
/// The model is fetched from `store`, loading it on first use.
pub fn predict(
    store: &ModelStore,
    spec: &ModelSpec,
    image: &DynamicImage,
) -> Result<PredictionResult, ClassifyError> {
    let model = store.load(spec)?;
    let started = Instant::now();

    let input_spec = model.classifier.input_spec();
    let batch = prepare_input(image, &input_spec, spec.preprocessing)?;

    let probabilities = model.classifier.predict_batch(&batch)?;
    if probabilities.nrows() != 1 {
        return Err(ClassifyError::Inference(format!(
            "expected one probability vector, got {}",
            probabilities.nrows()
        )));
    }
    let row = probabilities.row(0);
    if row.len() != model.labels.len() {
        return Err(ClassifyError::LabelWidth {
            classes: row.len(),
            labels: model.labels.len(),
        });
    }

    let sum: f32 = row.sum();
    if (sum - 1.0).abs() > PROBABILITY_SUM_TOLERANCE {
        warn!(
            "Classifier '{}' probabilities sum to {:.4}",
            model.classifier.name(),
            sum
        );
    }

    let (index, probability) = argmax(row)?;
    let label = model.labels.label_for(index)?.to_string();
    let confidence = confidence_percent(probability);

    debug!(
        "Predicted class {} '{}' ({:.4}) in {}ms",
        index,
        label,
        probability,
        started.elapsed().as_millis()
    );

    Ok(PredictionResult { label, confidence })
}
