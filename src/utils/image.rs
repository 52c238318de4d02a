//! Image loading and discovery utilities.

use crate::core::OCRError;
use crate::core::constants::{DEFAULT_PARALLEL_THRESHOLD, IMAGE_EXTENSIONS};
use image::{DynamicImage, RgbImage};
use std::path::{Path, PathBuf};

/// Converts a DynamicImage to an RgbImage.
pub fn dynamic_to_rgb(img: DynamicImage) -> RgbImage {
    img.to_rgb8()
}

/// Loads an image from a file path and converts it to RgbImage.
///
/// Animated formats yield their first frame.
///
/// # Errors
///
/// Returns `OCRError::ImageLoad` if the file cannot be opened or decoded.
pub fn load_image(path: &Path) -> Result<RgbImage, OCRError> {
    let img = image::open(path).map_err(OCRError::ImageLoad)?;
    Ok(dynamic_to_rgb(img))
}

/// Loads several images, one result per path in input order.
///
/// Loading runs on the rayon pool once there are more than
/// `parallel_threshold` paths (default [`DEFAULT_PARALLEL_THRESHOLD`]). A
/// failure only affects its own entry.
pub fn load_images_batch_with_threshold<P: AsRef<Path> + Send + Sync>(
    paths: &[P],
    parallel_threshold: Option<usize>,
) -> Vec<Result<RgbImage, OCRError>> {
    let threshold = parallel_threshold.unwrap_or(DEFAULT_PARALLEL_THRESHOLD);

    if paths.len() > threshold {
        use rayon::prelude::*;
        paths.par_iter().map(|p| load_image(p.as_ref())).collect()
    } else {
        paths.iter().map(|p| load_image(p.as_ref())).collect()
    }
}

/// Whether `path` has one of the recognized image extensions (case-insensitive).
pub fn has_image_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| {
            let ext = ext.to_ascii_lowercase();
            IMAGE_EXTENSIONS.contains(&ext.as_str())
        })
        .unwrap_or(false)
}

/// Collects image files from a file or a directory.
///
/// A file is returned as-is when its extension is recognized. A directory is
/// scanned (not recursively) for recognized files, returned sorted by path.
///
/// # Errors
///
/// Returns `InvalidInput` when no image file is found, and `Io` when the
/// directory cannot be read.
pub fn get_image_file_list(location: &Path) -> Result<Vec<PathBuf>, OCRError> {
    let mut files = Vec::new();

    if location.is_file() {
        if has_image_extension(location) {
            files.push(location.to_path_buf());
        }
    } else if location.is_dir() {
        for entry in std::fs::read_dir(location)? {
            let path = entry?.path();
            if path.is_file() && has_image_extension(&path) {
                files.push(path);
            }
        }
        files.sort();
    }

    if files.is_empty() {
        return Err(OCRError::invalid_input(format!(
            "no image files found in '{}'",
            location.display()
        )));
    }
    Ok(files)
}
