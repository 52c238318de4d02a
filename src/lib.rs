//! # OAR Text Recognition
//!
//! Batched text-line recognition on top of ONNX models. Given many cropped
//! text lines, the recognizer groups them by aspect ratio so that padding is
//! minimal, normalizes each group into the tensor layout the model expects,
//! runs the model once per group, optionally masks the output vocabulary and
//! decodes the result back into input order.
//!
//! ## Features
//!
//! - Stable aspect-ratio batching with results scattered back to input order
//! - Standard normalization (CRNN, Rosetta, STAR-Net, RARE) and the grayscale
//!   layout plus position/attention-bias inputs used by SRN
//! - Allow-list and deny-list character masking on the score tensor
//! - CTC, attention and SRN greedy label decoders
//! - ONNX Runtime integration, CPU or CUDA
//!
//! ## Modules
//!
//! * [`core`] - Errors, configuration, batch planning, traits and the ONNX adapter
//! * [`processors`] - Normalizers, character masks and label decoders
//! * [`predictor`] - The [`TextRecognizer`](predictor::TextRecognizer)
//! * [`utils`] - Image loading, character dictionaries and logging setup
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use oar_textrec::prelude::*;
//! use std::path::Path;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = RecognizerConfig {
//!     rec_char_dict_path: Some("models/ppocr_keys_v1.txt".into()),
//!     ..RecognizerConfig::default()
//! };
//! let recognizer = TextRecognizer::from_onnx(config, Path::new("models/rec.onnx"))?;
//!
//! let crops = vec![load_image(Path::new("line_0.png"))?];
//! let output = recognizer.recognize(&crops)?;
//! for result in &output.results {
//!     println!("{} ({:.3})", result.text, result.confidence);
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ### JSON Configuration
//!
//! ```rust
//! use oar_textrec::prelude::*;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = RecognizerConfig::from_json_str(r#"
//! {
//!   "rec_algorithm": "SRN",
//!   "rec_image_shape": "1, 64, 256",
//!   "rec_char_type": "en",
//!   "rec_batch_num": 8
//! }
//! "#)?;
//! assert_eq!(config.algorithm()?, RecAlgorithm::StructureAware);
//! # Ok(())
//! # }
//! ```

// Core modules
pub mod core;
pub mod predictor;
pub mod processors;
pub mod utils;

/// Prelude module for convenient imports.
///
/// ```rust
/// use oar_textrec::prelude::*;
/// ```
///
/// Covers the recognizer, its configuration, the collaborator traits and the
/// error types. Processors and decoders are imported from
/// [`processors`](crate::processors) directly.
pub mod prelude {
    pub use crate::core::config::{CharacterType, Geometry, RecAlgorithm, RecognizerConfig};
    pub use crate::core::traits::{CharacterEncoder, Decoder, Predictor, RecognitionInputs};
    pub use crate::core::{OCRError, OcrResult};
    pub use crate::predictor::{
        RecognitionOutput, RecognitionResult, TextRecognizer, TextRecognizerBuilder,
    };
    pub use crate::utils::{CharacterDict, load_image};
}
