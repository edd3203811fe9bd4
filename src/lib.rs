// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
pub mod api;
pub mod cli;
pub mod config;
pub mod input;
pub mod version;
pub mod vision;

// Re-export main types
pub use config::AppConfig;
pub use input::{FetchError, ImageFetcher, InputSource};
pub use vision::{
    BackgroundNormalizer, Classifier, ClassifyError, FruitClassifier, LabelIndex, ModelSpec,
    ModelStore, PredictionResult, Preprocessing,
};
