// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Image preprocessing for the fruit classifier
//!
//! Steps:
//! 1. Scale the shorter side to the model input size, center-crop the longer side
//! 2. Convert to an `(H, W, 3)` RGB float tensor with values in 0..=255
//! 3. Apply the model's named preprocessing transform
//! 4. Add the batch dimension, permuting to NCHW when the model expects it

use image::imageops::FilterType;
use image::{DynamicImage, GenericImageView};
use ndarray::{Array3, Array4, Axis};
use std::fmt;
use std::str::FromStr;

use super::error::ClassifyError;

/// Spatial size used when the model declares dynamic height/width
pub const DEFAULT_INPUT_SIZE: u32 = 224;

/// ImageNet channel means in BGR order, on the 0..=255 scale
pub const CAFFE_MEAN_BGR: [f32; 3] = [103.939, 116.779, 123.68];

/// Mean values for normalization (ImageNet, RGB)
pub const MEAN: [f32; 3] = [0.485, 0.456, 0.406];

/// Std values for normalization (ImageNet, RGB)
pub const STD: [f32; 3] = [0.229, 0.224, 0.225];

/// Memory layout of the model's image input
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TensorLayout {
    /// `[N, H, W, C]` (Keras / TensorFlow exports)
    Nhwc,
    /// `[N, C, H, W]` (PyTorch exports)
    Nchw,
}

/// Input geometry derived from the model's declared input shape
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InputSpec {
    pub height: u32,
    pub width: u32,
    pub layout: TensorLayout,
}

impl InputSpec {
    /// Interpret a declared input shape such as `[-1, 224, 224, 3]`
    pub fn from_shape(shape: &[i64]) -> Result<Self, ClassifyError> {
        if shape.len() != 4 {
            return Err(ClassifyError::ArtifactLoad(format!(
                "classifier input must be 4-dimensional, got {:?}",
                shape
            )));
        }

        let dim = |d: i64| {
            if d > 0 {
                d as u32
            } else {
                DEFAULT_INPUT_SIZE
            }
        };

        if shape[3] == 3 {
            Ok(Self {
                height: dim(shape[1]),
                width: dim(shape[2]),
                layout: TensorLayout::Nhwc,
            })
        } else if shape[1] == 3 {
            Ok(Self {
                height: dim(shape[2]),
                width: dim(shape[3]),
                layout: TensorLayout::Nchw,
            })
        } else {
            Err(ClassifyError::ArtifactLoad(format!(
                "classifier input {:?} has no 3-channel axis",
                shape
            )))
        }
    }

    /// Shape of a single-image batch in this layout
    pub fn batch_shape(&self) -> [usize; 4] {
        let (h, w) = (self.height as usize, self.width as usize);
        match self.layout {
            TensorLayout::Nhwc => [1, h, w, 3],
            TensorLayout::Nchw => [1, 3, h, w],
        }
    }
}

/// Numeric transform applied to the RGB tensor before inference
///
/// The transform belongs to the model: it must match what was applied
/// while the classifier was trained.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Preprocessing {
    /// RGB to BGR, then subtract the ImageNet BGR mean (no scaling)
    #[default]
    Caffe,
    /// Scale to 0..=1, then normalize with ImageNet mean/std
    Torch,
    /// Scale to -1..=1
    Tf,
    /// Leave pixel values untouched
    Raw,
}

impl Preprocessing {
    pub fn name(&self) -> &'static str {
        match self {
            Preprocessing::Caffe => "caffe",
            Preprocessing::Torch => "torch",
            Preprocessing::Tf => "tf",
            Preprocessing::Raw => "raw",
        }
    }

    /// Apply the transform in place to an `(H, W, 3)` RGB tensor
    pub fn apply(&self, tensor: &mut Array3<f32>) {
        match self {
            Preprocessing::Caffe => {
                for mut pixel in tensor.lanes_mut(Axis(2)) {
                    let (r, g, b) = (pixel[0], pixel[1], pixel[2]);
                    pixel[0] = b - CAFFE_MEAN_BGR[0];
                    pixel[1] = g - CAFFE_MEAN_BGR[1];
                    pixel[2] = r - CAFFE_MEAN_BGR[2];
                }
            }
            Preprocessing::Torch => {
                for mut pixel in tensor.lanes_mut(Axis(2)) {
                    for c in 0..3 {
                        pixel[c] = (pixel[c] / 255.0 - MEAN[c]) / STD[c];
                    }
                }
            }
            Preprocessing::Tf => tensor.mapv_inplace(|v| v / 127.5 - 1.0),
            Preprocessing::Raw => {}
        }
    }
}

impl fmt::Display for Preprocessing {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Preprocessing {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "caffe" | "resnet50" | "vgg16" => Ok(Preprocessing::Caffe),
            "torch" | "imagenet" => Ok(Preprocessing::Torch),
            "tf" | "mobilenet" | "inception" => Ok(Preprocessing::Tf),
            "raw" | "none" => Ok(Preprocessing::Raw),
            other => Err(format!(
                "unknown preprocessing '{}', supported: caffe, torch, tf, raw",
                other
            )),
        }
    }
}

/// Resize to exactly `width` x `height` without distorting the aspect ratio
///
/// The shorter side (relative to the target) is scaled to fit exactly and
/// the longer side is center-cropped. The crop window is taken in source
/// coordinates before resizing, so the working image never exceeds the
/// larger of the source and the target. An image that already has the
/// target size is returned unchanged.
pub fn resize_and_center_crop(
    image: &DynamicImage,
    width: u32,
    height: u32,
) -> Result<DynamicImage, ClassifyError> {
    let (orig_w, orig_h) = image.dimensions();

    if orig_w == 0 || orig_h == 0 {
        return Err(ClassifyError::InvalidImage(format!(
            "cannot resize a {}x{} image",
            orig_w, orig_h
        )));
    }
    if width == 0 || height == 0 {
        return Err(ClassifyError::InvalidImage(format!(
            "invalid target size {}x{}",
            width, height
        )));
    }

    if orig_w == width && orig_h == height {
        return Ok(image.clone());
    }

    // Source region that maps onto the target after scaling; the axis that
    // scales by the larger factor is kept whole
    let (ow, oh, tw, th) = (orig_w as u64, orig_h as u64, width as u64, height as u64);
    let (crop_w, crop_h) = if tw * oh >= th * ow {
        (orig_w, (th * ow).div_ceil(tw).clamp(1, oh) as u32)
    } else {
        ((tw * oh).div_ceil(th).clamp(1, ow) as u32, orig_h)
    };
    let offset_x = (orig_w - crop_w) / 2;
    let offset_y = (orig_h - crop_h) / 2;

    let cropped = image.crop_imm(offset_x, offset_y, crop_w, crop_h);
    Ok(cropped.resize_exact(width, height, FilterType::Nearest))
}

/// Convert an image to an `(H, W, 3)` RGB tensor with values in 0..=255
pub fn image_to_array(image: &DynamicImage) -> Array3<f32> {
    let rgb = image.to_rgb8();
    let (w, h) = rgb.dimensions();
    Array3::from_shape_fn((h as usize, w as usize, 3), |(y, x, c)| {
        rgb.get_pixel(x as u32, y as u32)[c] as f32
    })
}

/// Add a leading batch dimension of 1, in the requested layout
pub fn to_batch(tensor: Array3<f32>, layout: TensorLayout) -> Array4<f32> {
    let batch = tensor.insert_axis(Axis(0));
    match layout {
        TensorLayout::Nhwc => batch,
        TensorLayout::Nchw => batch
            .permuted_axes([0, 3, 1, 2])
            .as_standard_layout()
            .into_owned(),
    }
}

/// Resize, transform and batch a single image for the classifier
pub fn prepare_input(
    image: &DynamicImage,
    spec: &InputSpec,
    preprocessing: Preprocessing,
) -> Result<Array4<f32>, ClassifyError> {
    let resized = resize_and_center_crop(image, spec.width, spec.height)?;
    let mut tensor = image_to_array(&resized);
    preprocessing.apply(&mut tensor);
    Ok(to_batch(tensor, spec.layout))
}
