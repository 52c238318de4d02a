//! Constants used throughout the recognition pipeline.
//!
//! Default values for recognizer configuration, the structure-aware model's
//! auxiliary tensors, and image loading.

/// The default shape (channels, height, width) for recognition images.
pub const DEFAULT_REC_IMAGE_SHAPE: [usize; 3] = [3, 32, 320];

/// The default number of crops per predictor call.
pub const DEFAULT_BATCH_SIZE: usize = 6;

/// The default recognition algorithm name.
pub const DEFAULT_REC_ALGORITHM: &str = "CRNN";

/// The default maximum decoded sequence length.
pub const DEFAULT_MAX_TEXT_LENGTH: usize = 25;

/// The default attention head count of the structure-aware model.
pub const DEFAULT_SRN_NUM_HEADS: usize = 8;

/// Canvas width per unit of aspect ratio for wide-character scripts.
///
/// A group whose widest crop has ratio `r` is padded to `trunc(32 * r)` columns.
pub const WIDE_SCRIPT_WIDTH_UNIT: f32 = 32.0;

/// Value written into masked positions of the structure-aware attention biases.
pub const SRN_ATTENTION_BIAS: f32 = -1e9;

/// Downsampling factor between the structure-aware model input and its
/// encoder feature map.
pub const SRN_FEATURE_STRIDE: usize = 8;

/// The default threshold for parallel processing.
///
/// The minimum number of items before image loading switches to rayon.
pub const DEFAULT_PARALLEL_THRESHOLD: usize = 4;

/// The default character set for the `en` character type.
pub const DEFAULT_EN_CHARACTERS: &str = "0123456789abcdefghijklmnopqrstuvwxyz";

/// File extensions accepted when collecting images from a directory.
pub const IMAGE_EXTENSIONS: &[&str] = &["jpg", "bmp", "png", "jpeg", "rgb", "tif", "tiff", "gif"];
