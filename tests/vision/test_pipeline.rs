// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

//! Inference pipeline tests
//!
//! Run `predict` end to end against stub classifiers: geometry handed to the
//! model, argmax and label lookup, truncating confidence, typed failures.

use crate::mock::{
    encode, fruit_on_backdrop, raw_spec, store_with, StubLoader, FRUITS,
};
use fruit_classifier::vision::{
    predict, BackgroundNormalizer, ClassifyError, FruitClassifier, ModelSpec, ModelStore,
    OnnxArtifactLoader, Preprocessing,
};
use image::{DynamicImage, ImageFormat};
use std::sync::Arc;

const CLASSIFIER_MODEL_PATH: &str = "/workspace/models/fruits/resnet50_fruits.onnx";
const CLASSIFIER_LABELS_PATH: &str = "/workspace/models/fruits/class_index_to_label.json";
const FIXTURE_DIR: &str = "/workspace/fixtures/fruits";

#[cfg(test)]
mod pipeline_tests {
    use super::*;

    /// Test 1: Label and truncated confidence come from the classifier output
    #[test]
    fn test_predict_label_and_truncated_confidence() {
        let store = store_with(Arc::new(StubLoader::fixed(3, 0.995)));
        let image = fruit_on_backdrop(40, [120, 200, 60], [255, 255, 255]);

        let result = predict(&store, &raw_spec(), &image).unwrap();
        assert_eq!(result.label, "Kiwi");
        assert_eq!(result.confidence, 99);
    }

    /// Test 2: Certain predictions report 100
    #[test]
    fn test_predict_full_confidence() {
        let store = store_with(Arc::new(StubLoader::fixed(0, 1.0)));
        let result = predict(&store, &raw_spec(), &DynamicImage::new_rgb8(5, 5)).unwrap();
        assert_eq!(result.label, "Apple");
        assert_eq!(result.confidence, 100);
    }

    /// Test 3: Every class position maps to the label at the same index
    #[test]
    fn test_every_class_maps_to_its_label() {
        for (index, fruit) in FRUITS.iter().enumerate() {
            let store = store_with(Arc::new(StubLoader::fixed(index, 0.7)));
            let result = predict(&store, &raw_spec(), &DynamicImage::new_rgb8(20, 30)).unwrap();
            assert_eq!(result.label, *fruit);
            assert!(result.confidence <= 100);
        }
    }

    /// Test 4: NCHW models receive channel-first batches
    #[test]
    fn test_nchw_model_gets_channel_first_batch() {
        let loader = StubLoader::fixed(2, 0.6).with_input_shape(&[1, 3, 12, 10]);
        let store = store_with(Arc::new(loader));
        let result = predict(&store, &raw_spec(), &DynamicImage::new_rgb8(64, 48)).unwrap();
        assert_eq!(result.label, "Cherry");
    }

    /// Test 5: A label index narrower than the output is a label index error
    #[test]
    fn test_mismatched_label_index() {
        let loader = StubLoader::fixed(3, 0.9).with_labels(&["Apple", "Banana"]);
        let store = store_with(Arc::new(loader));

        let err = predict(&store, &raw_spec(), &DynamicImage::new_rgb8(8, 8)).unwrap_err();
        assert!(matches!(err, ClassifyError::LabelWidth { classes: 4, labels: 2 }));
        assert_eq!(err.kind(), "label_index_error");
    }

    /// Test 5b: Extra labels are rejected even when the winning index has a name
    ///
    /// The stub declares no static output width, so only the per-prediction
    /// check can catch the mismatch.
    #[test]
    fn test_label_index_wider_than_dynamic_output() {
        let loader = StubLoader::fixed(1, 0.9)
            .with_labels(&["Apple", "Banana", "Cherry", "Kiwi", "Mango", "Pear"]);
        let store = store_with(Arc::new(loader));

        let err = predict(&store, &raw_spec(), &DynamicImage::new_rgb8(8, 8)).unwrap_err();
        assert!(matches!(err, ClassifyError::LabelWidth { classes: 4, labels: 6 }));
        assert!(!err.is_user_recoverable());
    }

    /// Test 6: Zero-size input raises InvalidImage rather than a default label
    #[test]
    fn test_zero_size_image() {
        let store = store_with(Arc::new(StubLoader::fixed(0, 0.9)));
        let err = predict(&store, &raw_spec(), &DynamicImage::new_rgb8(0, 10)).unwrap_err();
        assert!(matches!(err, ClassifyError::InvalidImage(_)));
        assert!(err.is_user_recoverable());
    }

    /// Test 7: Missing artifacts surface as ArtifactLoad from predict
    #[test]
    fn test_missing_artifacts() {
        let store = ModelStore::new(Arc::new(OnnxArtifactLoader::new(1)));
        let spec = ModelSpec::new("/nonexistent.onnx", "/nonexistent.json", Preprocessing::Caffe);
        let err = predict(&store, &spec, &DynamicImage::new_rgb8(8, 8)).unwrap_err();
        assert!(matches!(err, ClassifyError::ArtifactLoad(_)));
    }

    // =============================================================================
    // Service (background removal + prediction)
    // =============================================================================

    /// Test 8: The classifier sees the backdrop replaced with white
    #[test]
    fn test_service_removes_background_before_predict() {
        let store = store_with(Arc::new(StubLoader::white_corner_detector()));
        let service = FruitClassifier::new(store, raw_spec(), Some(BackgroundNormalizer::default()));

        let image = fruit_on_backdrop(48, [230, 200, 30], [20, 20, 160]);
        assert_eq!(service.classify(&image).unwrap().label, "Banana");
    }

    /// Test 9: Encoded bytes are decoded and classified; garbage is InvalidImage
    #[test]
    fn test_service_classify_bytes() {
        let store = store_with(Arc::new(StubLoader::fixed(1, 0.75)));
        let service = FruitClassifier::new(store, raw_spec(), Some(BackgroundNormalizer::default()));

        let png = encode(&fruit_on_backdrop(32, [250, 220, 40], [0, 120, 0]), ImageFormat::Png);
        let jpeg = encode(&fruit_on_backdrop(32, [250, 220, 40], [0, 120, 0]), ImageFormat::Jpeg);
        assert_eq!(service.classify_bytes(&png).unwrap().confidence, 75);
        assert_eq!(service.classify_bytes(&jpeg).unwrap().label, "Banana");

        let err = service.classify_bytes(&[]).unwrap_err();
        assert!(matches!(err, ClassifyError::InvalidImage(_)));
    }

    /// Test 9b: A sliver-shaped upload classifies without blowing up memory
    #[test]
    fn test_service_classifies_extreme_aspect_ratio() {
        let store = store_with(Arc::new(StubLoader::fixed(2, 0.66)));
        let service = FruitClassifier::new(store, raw_spec(), Some(BackgroundNormalizer::default()));

        let sliver = DynamicImage::ImageRgb8(image::RgbImage::from_pixel(
            1,
            20000,
            image::Rgb([180, 20, 40]),
        ));
        let png = encode(&sliver, ImageFormat::Png);

        let result = service.classify_bytes(&png).unwrap();
        assert_eq!(result.label, "Cherry");
        assert_eq!(result.confidence, 66);
    }

    // =============================================================================
    // Real model (requires downloaded artifacts and fixtures)
    // =============================================================================

    /// Test 10: A fixture banana on a plain background is recognised
    #[test]
    #[ignore] // Only run if model files are downloaded
    fn test_real_model_recognises_fixture() {
        let store = Arc::new(ModelStore::onnx(4));
        let spec = ModelSpec::new(CLASSIFIER_MODEL_PATH, CLASSIFIER_LABELS_PATH, Preprocessing::Caffe);
        let service = FruitClassifier::new(store, spec, Some(BackgroundNormalizer::default()));

        let bytes = match std::fs::read(format!("{}/banana.jpg", FIXTURE_DIR)) {
            Ok(b) => b,
            Err(_) => return,
        };
        let result = service.classify_bytes(&bytes).unwrap();
        assert_eq!(result.label, "Banana");
        assert!(result.confidence >= 70, "confidence {}", result.confidence);
    }
}
