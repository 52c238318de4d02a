//! Preprocessing for the structure-aware (SRN) recognizer.
//!
//! SRN takes a grayscale image whose width is snapped to a multiple of the
//! model height, plus four tensors that only depend on the geometry: encoder
//! and decoder position indices and two self-attention bias masks.

use super::normalization::NormalizeImage;
use crate::core::config::Geometry;
use crate::core::constants::SRN_ATTENTION_BIAS;
use crate::core::{OCRError, Tensor3D, Tensor4D};
use image::imageops::FilterType;
use image::{GrayImage, Luma, RgbImage};
use ndarray::{Array3, Array4, ArrayViewMut3, Axis};

/// Normalizer for the structure-aware recognizer.
#[derive(Debug, Clone)]
pub struct SrnResize {
    geometry: Geometry,
    normalize: NormalizeImage,
}

impl SrnResize {
    pub fn new(geometry: Geometry) -> Self {
        Self {
            geometry,
            normalize: NormalizeImage::raw_grayscale(),
        }
    }

    /// Resize width for a crop of the given size.
    ///
    /// One, two or three times the model height when the crop is at most
    /// that many times wider than tall, otherwise the configured width.
    /// Never wider than the configured width.
    pub fn target_width(&self, width: u32, height: u32) -> usize {
        let Geometry {
            height: target_h,
            width: target_w,
            ..
        } = self.geometry;
        let (w, h) = (width as usize, height as usize);

        let snapped = (1..=3).find(|&k| w <= h * k).map(|k| target_h * k);
        snapped.unwrap_or(target_w).min(target_w)
    }

    /// Resizes one crop to grayscale and places it on a (1, H, W) canvas.
    pub fn resize_norm_img(&self, img: &RgbImage) -> Result<Tensor3D, OCRError> {
        let mut canvas = Array3::zeros((1, self.geometry.height, self.geometry.width));
        self.resize_norm_into(img, canvas.view_mut())?;
        Ok(canvas)
    }

    /// Normalizes a group of crops into one (B, 1, H, W) batch.
    pub fn apply(&self, imgs: &[&RgbImage]) -> Result<Tensor4D, OCRError> {
        let mut batch = Array4::zeros((imgs.len(), 1, self.geometry.height, self.geometry.width));
        for (img, canvas) in imgs.iter().zip(batch.axis_iter_mut(Axis(0))) {
            self.resize_norm_into(img, canvas)?;
        }
        Ok(batch)
    }

    fn resize_norm_into(&self, img: &RgbImage, canvas: ArrayViewMut3<f32>) -> Result<(), OCRError> {
        let (w, h) = img.dimensions();
        if w == 0 || h == 0 {
            return Err(OCRError::invalid_input(format!(
                "cannot resize a {}x{} image",
                w, h
            )));
        }

        let target_w = self.target_width(w, h);
        let resized = image::imageops::resize(
            img,
            target_w as u32,
            self.geometry.height as u32,
            FilterType::Triangle,
        );
        self.normalize.normalize_into(&to_gray_bt601(&resized), canvas)
    }
}

/// Converts to single-channel luma with BT.601 weights (0.299, 0.587, 0.114),
/// rounded to nearest. SRN models expect these weights; `imageops::grayscale`
/// uses Rec.709.
fn to_gray_bt601(img: &RgbImage) -> GrayImage {
    GrayImage::from_fn(img.width(), img.height(), |x, y| {
        let [r, g, b] = img.get_pixel(x, y).0;
        let luma = (299 * r as u32 + 587 * g as u32 + 114 * b as u32 + 500) / 1000;
        Luma([luma as u8])
    })
}

/// Position and attention-bias tensors fed to the structure-aware model.
///
/// Shapes carry a leading batch axis: `B = 1` as built, `B = n` after
/// [`replicate`](Self::replicate).
#[derive(Debug, Clone, PartialEq)]
pub struct SrnAuxiliaryInputs {
    /// (B, feature_dim, 1), values `0..feature_dim`.
    pub encoder_positions: Array3<i64>,
    /// (B, max_text_length, 1), values `0..max_text_length`.
    pub decoder_positions: Array3<i64>,
    /// (B, heads, L, L), -1e9 strictly above the diagonal.
    pub attention_bias_upper: Array4<f32>,
    /// (B, heads, L, L), -1e9 strictly below the diagonal.
    pub attention_bias_lower: Array4<f32>,
}

impl SrnAuxiliaryInputs {
    /// Builds the single-image tensors for a geometry.
    pub fn build(geometry: &Geometry, num_heads: usize, max_text_length: usize) -> Self {
        let feature_dim = geometry.feature_dim();
        let len = max_text_length;

        let encoder_positions = Array3::from_shape_fn((1, feature_dim, 1), |(_, i, _)| i as i64);
        let decoder_positions = Array3::from_shape_fn((1, len, 1), |(_, i, _)| i as i64);
        let attention_bias_upper = Array4::from_shape_fn((1, num_heads, len, len), |(_, _, i, j)| {
            if j > i { SRN_ATTENTION_BIAS } else { 0.0 }
        });
        let attention_bias_lower = Array4::from_shape_fn((1, num_heads, len, len), |(_, _, i, j)| {
            if j < i { SRN_ATTENTION_BIAS } else { 0.0 }
        });

        Self {
            encoder_positions,
            decoder_positions,
            attention_bias_upper,
            attention_bias_lower,
        }
    }

    /// Number of images the tensors cover.
    pub fn batch_size(&self) -> usize {
        self.encoder_positions.len_of(Axis(0))
    }

    /// Repeats single-image tensors `n` times along the batch axis.
    pub fn replicate(&self, n: usize) -> Result<Self, OCRError> {
        Ok(Self {
            encoder_positions: repeat_batch3(&self.encoder_positions, n)?,
            decoder_positions: repeat_batch3(&self.decoder_positions, n)?,
            attention_bias_upper: repeat_batch4(&self.attention_bias_upper, n)?,
            attention_bias_lower: repeat_batch4(&self.attention_bias_lower, n)?,
        })
    }
}

fn broadcast_error(shape: &[usize], n: usize) -> OCRError {
    OCRError::invalid_input(format!(
        "cannot replicate tensor of shape {:?} to batch size {}",
        shape, n
    ))
}

fn repeat_batch3<T: Clone>(array: &Array3<T>, n: usize) -> Result<Array3<T>, OCRError> {
    let (_, a, b) = array.dim();
    let view = array
        .broadcast((n, a, b))
        .ok_or_else(|| broadcast_error(array.shape(), n))?;
    Ok(view.as_standard_layout().into_owned())
}

fn repeat_batch4<T: Clone>(array: &Array4<T>, n: usize) -> Result<Array4<T>, OCRError> {
    let (_, a, b, c) = array.dim();
    let view = array
        .broadcast((n, a, b, c))
        .ok_or_else(|| broadcast_error(array.shape(), n))?;
    Ok(view.as_standard_layout().into_owned())
}
