//! Image normalization utilities for recognition models.
//!
//! This module maps 8-bit pixels to model input values with a per-channel
//! affine transform and writes them in channel-first layout into a
//! preallocated canvas.

use crate::core::OCRError;
use image::{ImageBuffer, Pixel};
use ndarray::ArrayViewMut3;

/// Normalizes images for recognition models.
///
/// Each channel value `x` becomes `x * alpha[c] + beta[c]`, where
/// `alpha = scale / std` and `beta = -mean / std`.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizeImage {
    /// Scaling factors for each channel (alpha = scale / std)
    pub alpha: Vec<f32>,
    /// Offset values for each channel (beta = -mean / std)
    pub beta: Vec<f32>,
}

impl NormalizeImage {
    /// Normalization used by the standard recognizers: `(x / 255 - 0.5) / 0.5`,
    /// mapping [0, 255] onto [-1, 1].
    pub fn for_ocr_recognition() -> Self {
        Self {
            alpha: vec![2.0 / 255.0; 3],
            beta: vec![-1.0; 3],
        }
    }

    /// Identity transform for single-channel input; raw [0, 255] values are kept.
    pub fn raw_grayscale() -> Self {
        Self {
            alpha: vec![1.0],
            beta: vec![0.0],
        }
    }

    /// Number of channels this normalizer expects.
    pub fn channels(&self) -> usize {
        self.alpha.len()
    }

    /// Writes `img` into the left-aligned region of a (C, H, W) canvas.
    ///
    /// Columns to the right of the image are left untouched.
    ///
    /// # Errors
    ///
    /// Returns `InvalidInput` if the channel counts disagree, the heights
    /// differ, or the image is wider than the canvas.
    pub fn normalize_into<P>(
        &self,
        img: &ImageBuffer<P, Vec<u8>>,
        mut canvas: ArrayViewMut3<f32>,
    ) -> Result<(), OCRError>
    where
        P: Pixel<Subpixel = u8>,
    {
        let channels = P::CHANNEL_COUNT as usize;
        let (canvas_c, canvas_h, canvas_w) = canvas.dim();
        if channels != self.channels() || channels != canvas_c {
            return Err(OCRError::InvalidInput {
                message: format!(
                    "channel mismatch: image has {}, normalizer expects {}, canvas has {}",
                    channels,
                    self.channels(),
                    canvas_c
                ),
            });
        }

        let (width, height) = (img.width() as usize, img.height() as usize);
        if height != canvas_h || width > canvas_w {
            return Err(OCRError::InvalidInput {
                message: format!(
                    "image {}x{} does not fit a {}x{} canvas",
                    width, height, canvas_w, canvas_h
                ),
            });
        }

        for (x, y, pixel) in img.enumerate_pixels() {
            for (c, &value) in pixel.channels().iter().enumerate() {
                canvas[[c, y as usize, x as usize]] = value as f32 * self.alpha[c] + self.beta[c];
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{GrayImage, Luma, Rgb, RgbImage};
    use ndarray::Array3;

    #[test]
    fn test_ocr_recognition_range() {
        let norm = NormalizeImage::for_ocr_recognition();
        let mut img = RgbImage::new(2, 1);
        img.put_pixel(0, 0, Rgb([0, 255, 127]));
        img.put_pixel(1, 0, Rgb([255, 0, 0]));

        let mut canvas = Array3::<f32>::zeros((3, 1, 4));
        norm.normalize_into(&img, canvas.view_mut()).unwrap();

        assert!((canvas[[0, 0, 0]] + 1.0).abs() < 1e-6);
        assert!((canvas[[1, 0, 0]] - 1.0).abs() < 1e-6);
        assert!((canvas[[2, 0, 0]] + 0.003_921_6).abs() < 1e-5);
        assert!((canvas[[0, 0, 1]] - 1.0).abs() < 1e-6);
        // untouched padding
        assert_eq!(canvas[[0, 0, 2]], 0.0);
        assert_eq!(canvas[[2, 0, 3]], 0.0);
    }

    #[test]
    fn test_raw_grayscale_keeps_values() {
        let norm = NormalizeImage::raw_grayscale();
        let img = GrayImage::from_pixel(3, 2, Luma([200]));
        let mut canvas = Array3::<f32>::zeros((1, 2, 5));
        norm.normalize_into(&img, canvas.view_mut()).unwrap();
        assert_eq!(canvas[[0, 1, 2]], 200.0);
        assert_eq!(canvas[[0, 1, 3]], 0.0);
    }

    #[test]
    fn test_channel_and_size_mismatch() {
        let norm = NormalizeImage::for_ocr_recognition();
        let gray = GrayImage::new(2, 2);
        let mut canvas = Array3::<f32>::zeros((3, 2, 4));
        assert!(norm.normalize_into(&gray, canvas.view_mut()).is_err());

        let wide = RgbImage::new(5, 2);
        assert!(norm.normalize_into(&wide, canvas.view_mut()).is_err());
    }
}
