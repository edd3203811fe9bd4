// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

//! Background normalizer tests

use crate::mock::fruit_on_backdrop;
use fruit_classifier::vision::{
    composite_on_white, BackgroundNormalizer, BorderSegmenter, ClassifyError, Segmenter,
};
use image::{DynamicImage, GrayImage, Luma, Rgb, Rgba, RgbaImage};
use std::sync::Arc;

/// Segmenter that marks the whole image as foreground
struct EverythingForeground;

impl Segmenter for EverythingForeground {
    fn name(&self) -> &str {
        "everything"
    }

    fn foreground_mask(&self, image: &DynamicImage) -> Result<GrayImage, ClassifyError> {
        Ok(GrayImage::from_pixel(image.width(), image.height(), Luma([255])))
    }
}

/// Segmenter that always fails
struct Broken;

impl Segmenter for Broken {
    fn name(&self) -> &str {
        "broken"
    }

    fn foreground_mask(&self, _image: &DynamicImage) -> Result<GrayImage, ClassifyError> {
        Err(ClassifyError::Segmentation("model rejected input".to_string()))
    }
}

#[test]
fn test_non_white_background_becomes_white() {
    let image = fruit_on_backdrop(40, [200, 40, 40], [40, 90, 200]);
    let out = BackgroundNormalizer::default().remove_background(&image).unwrap();

    assert!(matches!(out, DynamicImage::ImageRgb8(_)));
    let rgb = out.to_rgb8();
    for (x, y) in [(0, 0), (39, 0), (0, 39), (39, 39), (5, 20), (20, 5)] {
        assert_eq!(rgb.get_pixel(x, y), &Rgb([255, 255, 255]), "pixel ({}, {})", x, y);
    }
    assert_eq!(rgb.get_pixel(20, 20), &Rgb([200, 40, 40]));
}

#[test]
fn test_output_has_no_alpha() {
    let mut rgba = RgbaImage::from_pixel(10, 10, Rgba([0, 0, 0, 0]));
    rgba.put_pixel(5, 5, Rgba([10, 200, 10, 255]));

    let normalizer = BackgroundNormalizer::new(Arc::new(EverythingForeground));
    let out = normalizer
        .remove_background(&DynamicImage::ImageRgba8(rgba))
        .unwrap();

    assert!(!out.color().has_alpha());
    let rgb = out.to_rgb8();
    assert_eq!(rgb.get_pixel(0, 0), &Rgb([255, 255, 255]));
    assert_eq!(rgb.get_pixel(5, 5), &Rgb([10, 200, 10]));
}

#[test]
fn test_grayscale_input_is_converted_to_rgb() {
    let gray = GrayImage::from_pixel(6, 6, Luma([90]));
    let out = BackgroundNormalizer::default()
        .remove_background(&DynamicImage::ImageLuma8(gray))
        .unwrap();
    assert!(matches!(out, DynamicImage::ImageRgb8(_)));
}

#[test]
fn test_referentially_transparent() {
    let image = fruit_on_backdrop(24, [250, 150, 0], [10, 10, 10]);
    let normalizer = BackgroundNormalizer::new(Arc::new(BorderSegmenter::new(30)));
    let a = normalizer.remove_background(&image).unwrap();
    let b = normalizer.remove_background(&image).unwrap();
    assert_eq!(a.to_rgb8().into_raw(), b.to_rgb8().into_raw());
}

#[test]
fn test_zero_size_input_is_segmentation_error() {
    let err = BackgroundNormalizer::default()
        .remove_background(&DynamicImage::new_rgba8(0, 0))
        .unwrap_err();
    assert!(matches!(err, ClassifyError::Segmentation(_)));
}

#[test]
fn test_segmenter_failure_propagates() {
    let normalizer = BackgroundNormalizer::new(Arc::new(Broken));
    let err = normalizer
        .remove_background(&DynamicImage::new_rgb8(4, 4))
        .unwrap_err();
    assert_eq!(err.kind(), "segmentation_error");
    assert_eq!(normalizer.segmenter_name(), "broken");
}

#[test]
fn test_composite_uses_mask() {
    let image = DynamicImage::ImageRgb8(image::RgbImage::from_pixel(2, 1, Rgb([0, 0, 0])));
    let mut mask = GrayImage::new(2, 1);
    mask.put_pixel(0, 0, Luma([255]));

    let out = composite_on_white(&image, &mask).unwrap();
    assert_eq!(out.get_pixel(0, 0), &Rgb([0, 0, 0]));
    assert_eq!(out.get_pixel(1, 0), &Rgb([255, 255, 255]));
}
