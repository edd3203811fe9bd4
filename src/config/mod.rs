// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Application configuration
//!
//! Every setting comes from an environment variable (a `.env` file is loaded
//! by the binaries first) and has a default, so the server starts with no
//! configuration when the model files sit in `./models`.

use std::env;
use std::path::PathBuf;

use crate::vision::image_utils::MAX_IMAGE_SIZE;
use crate::vision::{ModelSpec, Preprocessing, DEFAULT_BORDER_TOLERANCE};

pub const DEFAULT_MODEL_PATH: &str = "./models/resnet50_fruits.onnx";
pub const DEFAULT_LABELS_PATH: &str = "./models/class_index_to_label.json";

/// Runtime configuration for the classifier, HTTP server and URL fetcher
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Serialized classifier (default: ./models/resnet50_fruits.onnx)
    pub model_path: PathBuf,
    /// Class-index to label mapping (default: ./models/class_index_to_label.json)
    pub labels_path: PathBuf,
    /// Name of the preprocessing transform bundled with the model (default: caffe)
    pub preprocessing: String,
    /// Optional ONNX segmentation model; the border segmenter is used when unset
    pub segmentation_model_path: Option<PathBuf>,
    /// Colour tolerance of the border segmenter (default: 40)
    pub segmentation_tolerance: u8,
    /// Skip background removal entirely
    pub remove_background: bool,
    pub host: String,
    pub port: u16,
    /// Timeout for fetching URL images in seconds (default: 10)
    pub fetch_timeout_secs: u64,
    /// Largest accepted image payload (default: 10 MiB)
    pub max_image_bytes: usize,
    /// ONNX Runtime intra-op threads (default: 4)
    pub intra_threads: usize,
    /// Load the model at startup instead of on the first request (default: true)
    pub warm_up: bool,
}

fn parse_var<T, F>(lookup: &F, key: &str) -> Option<T>
where
    T: std::str::FromStr,
    F: Fn(&str) -> Option<String>,
{
    lookup(key).and_then(|v| v.trim().parse().ok())
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

impl AppConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration from an arbitrary key lookup
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        Self {
            model_path: lookup("CLASSIFIER_MODEL_PATH")
                .map(PathBuf::from)
                .unwrap_or(defaults.model_path),
            labels_path: lookup("CLASSIFIER_LABELS_PATH")
                .map(PathBuf::from)
                .unwrap_or(defaults.labels_path),
            preprocessing: lookup("CLASSIFIER_PREPROCESSING").unwrap_or(defaults.preprocessing),
            segmentation_model_path: lookup("SEGMENTATION_MODEL_PATH")
                .filter(|v| !v.trim().is_empty())
                .map(PathBuf::from),
            segmentation_tolerance: parse_var(&lookup, "SEGMENTATION_TOLERANCE")
                .unwrap_or(defaults.segmentation_tolerance),
            remove_background: lookup("REMOVE_BACKGROUND")
                .and_then(|v| parse_bool(&v))
                .unwrap_or(defaults.remove_background),
            host: lookup("API_HOST").unwrap_or(defaults.host),
            port: parse_var(&lookup, "API_PORT").unwrap_or(defaults.port),
            fetch_timeout_secs: parse_var(&lookup, "IMAGE_FETCH_TIMEOUT_SECS")
                .unwrap_or(defaults.fetch_timeout_secs),
            max_image_bytes: parse_var(&lookup, "MAX_IMAGE_BYTES").unwrap_or(defaults.max_image_bytes),
            intra_threads: parse_var(&lookup, "CLASSIFIER_INTRA_THREADS").unwrap_or(defaults.intra_threads),
            warm_up: lookup("WARM_UP_MODEL")
                .and_then(|v| parse_bool(&v))
                .unwrap_or(defaults.warm_up),
        }
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<(), String> {
        self.preprocessing.parse::<Preprocessing>()?;

        if self.port == 0 {
            return Err("API_PORT must be a non-zero port".to_string());
        }
        if self.fetch_timeout_secs == 0 {
            return Err("IMAGE_FETCH_TIMEOUT_SECS must be at least 1".to_string());
        }
        if self.max_image_bytes < 1024 {
            return Err("MAX_IMAGE_BYTES must be at least 1024".to_string());
        }
        if self.intra_threads == 0 {
            return Err("CLASSIFIER_INTRA_THREADS must be at least 1".to_string());
        }
        Ok(())
    }

    /// Artifact identity of the configured classifier
    pub fn model_spec(&self) -> Result<ModelSpec, String> {
        let preprocessing = self.preprocessing.parse::<Preprocessing>()?;
        Ok(ModelSpec::new(
            self.model_path.clone(),
            self.labels_path.clone(),
            preprocessing,
        ))
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Which background removal the service will run
    pub fn background_removal_mode(&self) -> String {
        if !self.remove_background {
            return "disabled".to_string();
        }
        match &self.segmentation_model_path {
            Some(path) => format!("ONNX model {}", path.display()),
            None => format!("border flood fill (tolerance {})", self.segmentation_tolerance),
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            model_path: PathBuf::from(DEFAULT_MODEL_PATH),
            labels_path: PathBuf::from(DEFAULT_LABELS_PATH),
            preprocessing: Preprocessing::default().name().to_string(),
            segmentation_model_path: None,
            segmentation_tolerance: DEFAULT_BORDER_TOLERANCE,
            remove_background: true,
            host: "0.0.0.0".to_string(),
            port: 8501,
            fetch_timeout_secs: 10,
            max_image_bytes: MAX_IMAGE_SIZE,
            intra_threads: 4,
            warm_up: true,
        }
    }
}
