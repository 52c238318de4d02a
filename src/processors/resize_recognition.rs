//! Resize and normalization for the standard recognition algorithms.
//!
//! Crops are resized to the model height keeping their aspect ratio, mapped
//! to [-1, 1], and left-aligned on a zero canvas whose width is shared by the
//! whole group.

use super::normalization::NormalizeImage;
use crate::core::config::{CharacterType, Geometry};
use crate::core::constants::WIDE_SCRIPT_WIDTH_UNIT;
use crate::core::{OCRError, Tensor3D, Tensor4D};
use image::RgbImage;
use image::imageops::FilterType;
use ndarray::{Array3, Array4, ArrayViewMut3, Axis};

/// Normalizer for CTC and attention recognizers.
#[derive(Debug, Clone)]
pub struct OCRResize {
    geometry: Geometry,
    char_type: CharacterType,
    normalize: NormalizeImage,
}

impl OCRResize {
    pub fn new(geometry: Geometry, char_type: CharacterType) -> Self {
        Self {
            geometry,
            char_type,
            normalize: NormalizeImage::for_ocr_recognition(),
        }
    }

    /// Width of the padded canvas for a group whose widest crop has ratio
    /// `max_wh_ratio`.
    ///
    /// Wide-character scripts use `trunc(32 * max_wh_ratio)` for the whole
    /// group; other scripts keep the configured width.
    pub fn canvas_width(&self, max_wh_ratio: f32) -> usize {
        if self.char_type.uses_group_width() {
            ((WIDE_SCRIPT_WIDTH_UNIT * max_wh_ratio) as usize).max(1)
        } else {
            self.geometry.width
        }
    }

    /// Resizes and normalizes one crop into a (C, H, canvas width) tensor.
    pub fn resize_norm_img(&self, img: &RgbImage, max_wh_ratio: f32) -> Result<Tensor3D, OCRError> {
        let canvas_w = self.canvas_width(max_wh_ratio);
        let mut canvas = Array3::zeros((self.geometry.channels, self.geometry.height, canvas_w));
        self.resize_norm_into(img, canvas.view_mut())?;
        Ok(canvas)
    }

    /// Normalizes a group of crops into one (B, C, H, W') batch.
    pub fn apply(&self, imgs: &[&RgbImage], max_wh_ratio: f32) -> Result<Tensor4D, OCRError> {
        let canvas_w = self.canvas_width(max_wh_ratio);
        let mut batch = Array4::zeros((
            imgs.len(),
            self.geometry.channels,
            self.geometry.height,
            canvas_w,
        ));
        for (img, canvas) in imgs.iter().zip(batch.axis_iter_mut(Axis(0))) {
            self.resize_norm_into(img, canvas)?;
        }
        Ok(batch)
    }

    fn resize_norm_into(&self, img: &RgbImage, canvas: ArrayViewMut3<f32>) -> Result<(), OCRError> {
        if self.geometry.channels != 3 {
            return Err(OCRError::invalid_input(format!(
                "image has 3 channels but the model geometry declares {}",
                self.geometry.channels
            )));
        }
        let (w, h) = img.dimensions();
        if w == 0 || h == 0 {
            return Err(OCRError::invalid_input(format!(
                "cannot resize a {}x{} image",
                w, h
            )));
        }

        let target_h = self.geometry.height;
        let canvas_w = canvas.dim().2;
        let ratio = w as f32 / h as f32;
        let resized_w = ((target_h as f32 * ratio).ceil() as usize).clamp(1, canvas_w);

        let resized = image::imageops::resize(
            img,
            resized_w as u32,
            target_h as u32,
            FilterType::Triangle,
        );
        self.normalize.normalize_into(&resized, canvas)
    }
}
