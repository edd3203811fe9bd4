// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

//! Model store tests
//!
//! Verify that the store:
//! - Reads artifacts from storage once per process
//! - Serializes near-simultaneous first loads
//! - Surfaces load failures without caching them
//! - Checks label count against the classifier output width

use crate::mock::{raw_spec, store_with, StubLoader};
use fruit_classifier::vision::{
    ArtifactLoader, ClassifyError, ModelSpec, ModelStore, OnnxArtifactLoader, Preprocessing,
};
use std::sync::Arc;
use std::time::Duration;

// Model paths (downloaded separately)
const CLASSIFIER_MODEL_PATH: &str = "/workspace/models/fruits/resnet50_fruits.onnx";
const CLASSIFIER_LABELS_PATH: &str = "/workspace/models/fruits/class_index_to_label.json";

#[cfg(test)]
mod model_store_tests {
    use super::*;

    // =============================================================================
    // Caching
    // =============================================================================

    /// Test 1: Two loads return the same instance and read storage once
    #[test]
    fn test_load_twice_reads_storage_once() {
        let loader = Arc::new(StubLoader::fixed(0, 0.9));
        let store = store_with(loader.clone());

        let first = store.load(&raw_spec()).unwrap();
        let second = store.load(&raw_spec()).unwrap();

        assert!(Arc::ptr_eq(&first, &second));
        assert!(Arc::ptr_eq(&first.classifier, &second.classifier));
        assert_eq!(loader.load_count(), 1);
        assert_eq!(store.disk_loads(), 1);
    }

    /// Test 2: Concurrent first requests share a single load
    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_first_requests_load_once() {
        let loader = Arc::new(StubLoader::fixed(1, 0.8).with_delay(Duration::from_millis(100)));
        let store = store_with(loader.clone());

        let handles: Vec<_> = (0..6)
            .map(|_| {
                let store = store.clone();
                tokio::task::spawn_blocking(move || store.load(&raw_spec()))
            })
            .collect();

        let mut models = Vec::new();
        for handle in handles {
            models.push(handle.await.unwrap().unwrap());
        }

        assert_eq!(loader.load_count(), 1);
        for model in &models[1..] {
            assert!(Arc::ptr_eq(&models[0], model));
        }
    }

    /// Test 3: A different preprocessing identity is a different model
    #[test]
    fn test_spec_is_cache_key() {
        let loader = Arc::new(StubLoader::fixed(0, 0.9));
        let store = store_with(loader.clone());

        let caffe = ModelSpec::new("a.onnx", "a.json", Preprocessing::Caffe);
        let torch = ModelSpec::new("a.onnx", "a.json", Preprocessing::Torch);
        store.load(&caffe).unwrap();
        store.load(&torch).unwrap();
        store.load(&caffe).unwrap();

        assert_eq!(loader.load_count(), 2);
        assert!(store.is_loaded(&caffe) && store.is_loaded(&torch));
    }

    // =============================================================================
    // Failures
    // =============================================================================

    /// Test 4: Missing artifacts surface as ArtifactLoad and are retried on the next call
    #[test]
    fn test_missing_artifacts_not_cached() {
        let store = ModelStore::onnx(1);
        let spec = ModelSpec::new(
            "/nonexistent/model.onnx",
            "/nonexistent/labels.json",
            Preprocessing::Caffe,
        );

        for _ in 0..2 {
            let err = store.load(&spec).unwrap_err();
            assert!(matches!(err, ClassifyError::ArtifactLoad(_)));
        }
        assert_eq!(store.disk_loads(), 2);
        assert!(!store.is_loaded(&spec));
    }

    /// Test 5: A corrupt model file is an ArtifactLoad error, not a panic
    #[test]
    fn test_corrupt_model_file() {
        let dir = tempfile::tempdir().unwrap();
        let model = dir.path().join("model.onnx");
        let labels = dir.path().join("labels.json");
        std::fs::write(&model, b"\x00\x01garbage").unwrap();
        std::fs::write(&labels, r#"{"0": "Apple", "1": "Banana"}"#).unwrap();

        let spec = ModelSpec::new(model, labels, Preprocessing::Caffe);
        let err = OnnxArtifactLoader::new(1).load(&spec).unwrap_err();
        assert!(matches!(err, ClassifyError::ArtifactLoad(_)));
    }

    /// Test 6: A label index with gaps is rejected before the model is read
    #[test]
    fn test_label_index_with_gap_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let labels = dir.path().join("labels.json");
        std::fs::write(&labels, r#"{"0": "Apple", "2": "Cherry"}"#).unwrap();

        let spec = ModelSpec::new(dir.path().join("model.onnx"), labels, Preprocessing::Caffe);
        let err = OnnxArtifactLoader::new(1).load(&spec).unwrap_err();
        assert!(err.to_string().contains("class 1"));
    }

    // =============================================================================
    // Real model (requires downloaded artifacts)
    // =============================================================================

    /// Test 7: The trained model loads with a label per output class
    #[test]
    #[ignore] // Only run if model files are downloaded
    fn test_real_model_label_width_matches() {
        let store = ModelStore::onnx(4);
        let spec = ModelSpec::new(CLASSIFIER_MODEL_PATH, CLASSIFIER_LABELS_PATH, Preprocessing::Caffe);

        let model = store.load(&spec).unwrap();
        assert_eq!(model.labels.len(), 20);
        assert_eq!(model.classifier.num_classes(), Some(20));
    }
}
