// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Background normalization
//!
//! A `Segmenter` produces a per-pixel foreground mask (255 = subject,
//! 0 = background). `BackgroundNormalizer` composites the original pixels
//! over solid white using that mask and flattens alpha, so the classifier
//! always sees a 3-channel image with a uniform background.

use image::{imageops::FilterType, DynamicImage, GenericImageView, GrayImage, Luma, Rgb, RgbImage};
use ndarray::Array4;
use ort::execution_providers::CPUExecutionProvider;
use ort::session::builder::GraphOptimizationLevel;
use ort::session::Session;
use ort::value::Value;
use std::path::Path;
use std::sync::{Arc, Mutex};
use tracing::{debug, info};

use super::error::ClassifyError;
use super::preprocessing::{MEAN, STD};

/// Default square input size for U²-Net style segmentation models
pub const SEGMENTATION_INPUT_SIZE: u32 = 320;

/// Default colour distance under which a pixel counts as background
pub const DEFAULT_BORDER_TOLERANCE: u8 = 40;

/// Produces a foreground mask with the same dimensions as the input
pub trait Segmenter: Send + Sync {
    fn name(&self) -> &str;

    fn foreground_mask(&self, image: &DynamicImage) -> Result<GrayImage, ClassifyError>;
}

fn ensure_non_empty(image: &DynamicImage) -> Result<(), ClassifyError> {
    if image.width() == 0 || image.height() == 0 {
        return Err(ClassifyError::Segmentation(format!(
            "cannot segment a {}x{} image",
            image.width(),
            image.height()
        )));
    }
    Ok(())
}

/// Salient-object segmentation with an ONNX model (U²-Net, ISNet, ...)
pub struct OnnxSegmenter {
    session: Mutex<Session>,
    input_name: String,
    input_size: u32,
}

impl std::fmt::Debug for OnnxSegmenter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OnnxSegmenter")
            .field("input_name", &self.input_name)
            .field("input_size", &self.input_size)
            .finish_non_exhaustive()
    }
}

impl OnnxSegmenter {
    pub fn load<P: AsRef<Path>>(model_path: P, intra_threads: usize) -> Result<Self, ClassifyError> {
        let model_path = model_path.as_ref();

        if !model_path.exists() {
            return Err(ClassifyError::ArtifactLoad(format!(
                "segmentation model not found: {}",
                model_path.display()
            )));
        }

        info!("Loading segmentation model from {}", model_path.display());

        let load_err =
            |e: ort::Error| ClassifyError::ArtifactLoad(format!("segmentation model: {}", e));

        let session = Session::builder()
            .map_err(load_err)?
            .with_execution_providers([CPUExecutionProvider::default().build()])
            .map_err(load_err)?
            .with_optimization_level(GraphOptimizationLevel::Level3)
            .map_err(load_err)?
            .with_intra_threads(intra_threads.max(1))
            .map_err(load_err)?
            .commit_from_file(model_path)
            .map_err(load_err)?;

        let input_name = session
            .inputs
            .first()
            .map(|i| i.name.clone())
            .ok_or_else(|| {
                ClassifyError::ArtifactLoad("segmentation model declares no inputs".to_string())
            })?;

        info!("✅ Segmentation model loaded (input '{}')", input_name);

        Ok(Self {
            session: Mutex::new(session),
            input_name,
            input_size: SEGMENTATION_INPUT_SIZE,
        })
    }

    /// NCHW tensor: max-normalized, then ImageNet mean/std
    fn preprocess(&self, image: &DynamicImage) -> Array4<f32> {
        let size = self.input_size;
        let resized = image
            .resize_exact(size, size, FilterType::Triangle)
            .to_rgb8();

        let max = resized.pixels().flat_map(|p| p.0).max().unwrap_or(0).max(1) as f32;

        let mut tensor = Array4::<f32>::zeros((1, 3, size as usize, size as usize));
        for (x, y, pixel) in resized.enumerate_pixels() {
            for c in 0..3 {
                let value = pixel[c] as f32 / max;
                tensor[[0, c, y as usize, x as usize]] = (value - MEAN[c]) / STD[c];
            }
        }
        tensor
    }
}

impl Segmenter for OnnxSegmenter {
    fn name(&self) -> &str {
        "onnx"
    }

    fn foreground_mask(&self, image: &DynamicImage) -> Result<GrayImage, ClassifyError> {
        ensure_non_empty(image)?;
        let (width, height) = image.dimensions();

        let input = self.preprocess(image);

        let seg_err = |e: ort::Error| ClassifyError::Segmentation(e.to_string());

        let mut session = self
            .session
            .lock()
            .map_err(|_| ClassifyError::Segmentation("segmentation session lock poisoned".to_string()))?;
        let input_value = Value::from_array(input).map_err(seg_err)?;
        let outputs = session
            .run(ort::inputs![&self.input_name => input_value])
            .map_err(seg_err)?;

        let output = outputs[0].try_extract_array::<f32>().map_err(seg_err)?;

        // [1, 1, H, W] or [1, H, W]
        let shape = output.shape().to_vec();
        let (mh, mw) = match shape.as_slice() {
            [.., h, w] if *h > 0 && *w > 0 => (*h, *w),
            _ => {
                return Err(ClassifyError::Segmentation(format!(
                    "unexpected mask shape {:?}",
                    shape
                )))
            }
        };
        let plane = output
            .to_shape((mh, mw))
            .map_err(|e| ClassifyError::Segmentation(e.to_string()))?
            .to_owned();

        let (lo, hi) = plane
            .iter()
            .fold((f32::INFINITY, f32::NEG_INFINITY), |(lo, hi), &v| (lo.min(v), hi.max(v)));
        let range = (hi - lo).max(f32::EPSILON);

        let small = GrayImage::from_fn(mw as u32, mh as u32, |x, y| {
            let v = (plane[[y as usize, x as usize]] - lo) / range;
            Luma([(v.clamp(0.0, 1.0) * 255.0) as u8])
        });

        debug!("Segmentation mask {}x{} -> {}x{}", mw, mh, width, height);

        Ok(image::imageops::resize(&small, width, height, FilterType::Lanczos3))
    }
}

/// Model-free segmenter for photos on a roughly uniform backdrop
///
/// Estimates the background colour from the image border, then flood-fills
/// every pixel connected to the border whose colour is within `tolerance`
/// of that estimate.
#[derive(Debug, Clone)]
pub struct BorderSegmenter {
    tolerance: u8,
}

impl BorderSegmenter {
    pub fn new(tolerance: u8) -> Self {
        Self { tolerance }
    }

    pub fn tolerance(&self) -> u8 {
        self.tolerance
    }

    /// Per-channel median of the border pixels
    fn background_colour(image: &RgbImage) -> Rgb<u8> {
        let (w, h) = image.dimensions();
        let mut channels: [Vec<u8>; 3] = [Vec::new(), Vec::new(), Vec::new()];

        let mut push = |p: &Rgb<u8>| {
            for (c, values) in channels.iter_mut().enumerate() {
                values.push(p[c]);
            }
        };
        for x in 0..w {
            push(image.get_pixel(x, 0));
            push(image.get_pixel(x, h - 1));
        }
        for y in 0..h {
            push(image.get_pixel(0, y));
            push(image.get_pixel(w - 1, y));
        }

        let mut median = [0u8; 3];
        for (c, values) in channels.iter_mut().enumerate() {
            values.sort_unstable();
            median[c] = values[values.len() / 2];
        }
        Rgb(median)
    }

    fn is_background(&self, pixel: &Rgb<u8>, background: &Rgb<u8>) -> bool {
        pixel
            .0
            .iter()
            .zip(background.0.iter())
            .all(|(a, b)| a.abs_diff(*b) <= self.tolerance)
    }
}

impl Default for BorderSegmenter {
    fn default() -> Self {
        Self::new(DEFAULT_BORDER_TOLERANCE)
    }
}

impl Segmenter for BorderSegmenter {
    fn name(&self) -> &str {
        "border"
    }

    fn foreground_mask(&self, image: &DynamicImage) -> Result<GrayImage, ClassifyError> {
        ensure_non_empty(image)?;

        let rgb = image.to_rgb8();
        let (w, h) = rgb.dimensions();
        let background = Self::background_colour(&rgb);

        let mut mask = GrayImage::from_pixel(w, h, Luma([255]));
        let mut visited = vec![false; (w as usize) * (h as usize)];
        let mut stack: Vec<(u32, u32)> = Vec::new();

        for x in 0..w {
            stack.push((x, 0));
            stack.push((x, h - 1));
        }
        for y in 0..h {
            stack.push((0, y));
            stack.push((w - 1, y));
        }

        while let Some((x, y)) = stack.pop() {
            let idx = (y as usize) * (w as usize) + x as usize;
            if visited[idx] {
                continue;
            }
            visited[idx] = true;

            if !self.is_background(rgb.get_pixel(x, y), &background) {
                continue;
            }
            mask.put_pixel(x, y, Luma([0]));

            // 4-connected
            if x > 0 {
                stack.push((x - 1, y));
            }
            if x + 1 < w {
                stack.push((x + 1, y));
            }
            if y > 0 {
                stack.push((x, y - 1));
            }
            if y + 1 < h {
                stack.push((x, y + 1));
            }
        }

        debug!(
            "Border segmentation: background {:?}, tolerance {}",
            background.0, self.tolerance
        );

        Ok(mask)
    }
}

/// Composite `image` over solid white using `mask`, dropping alpha
pub fn composite_on_white(image: &DynamicImage, mask: &GrayImage) -> Result<RgbImage, ClassifyError> {
    if image.dimensions() != mask.dimensions() {
        return Err(ClassifyError::Segmentation(format!(
            "mask is {}x{} but image is {}x{}",
            mask.width(),
            mask.height(),
            image.width(),
            image.height()
        )));
    }

    let rgba = image.to_rgba8();
    Ok(RgbImage::from_fn(rgba.width(), rgba.height(), |x, y| {
        let px = rgba.get_pixel(x, y);
        let a = (mask.get_pixel(x, y)[0] as f32 / 255.0) * (px[3] as f32 / 255.0);
        let blend = |c: u8| (c as f32 * a + 255.0 * (1.0 - a)).round().clamp(0.0, 255.0) as u8;
        Rgb([blend(px[0]), blend(px[1]), blend(px[2])])
    }))
}

/// Replaces image backgrounds with solid white
#[derive(Clone)]
pub struct BackgroundNormalizer {
    segmenter: Arc<dyn Segmenter>,
}

impl std::fmt::Debug for BackgroundNormalizer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BackgroundNormalizer")
            .field("segmenter", &self.segmenter.name())
            .finish()
    }
}

impl BackgroundNormalizer {
    pub fn new(segmenter: Arc<dyn Segmenter>) -> Self {
        Self { segmenter }
    }

    pub fn segmenter_name(&self) -> &str {
        self.segmenter.name()
    }

    /// Return the subject on a white background as an RGB8 image
    pub fn remove_background(&self, image: &DynamicImage) -> Result<DynamicImage, ClassifyError> {
        ensure_non_empty(image)?;
        let mask = self.segmenter.foreground_mask(image)?;
        let composited = composite_on_white(image, &mask)?;
        Ok(DynamicImage::ImageRgb8(composited))
    }
}

impl Default for BackgroundNormalizer {
    fn default() -> Self {
        Self::new(Arc::new(BorderSegmenter::default()))
    }
}
