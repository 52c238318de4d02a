//! Collaborator traits used by the text recognizer.
//!
//! # Examples
//!
//! ```rust,no_run
//! use oar_textrec::core::traits::{Predictor, RecognitionInputs};
//! use oar_textrec::core::inference::TensorOutput;
//! use oar_textrec::core::OCRError;
//!
//! #[derive(Debug)]
//! struct Blank {
//!     vocab: usize,
//! }
//!
//! impl Predictor for Blank {
//!     fn predict(
//!         &self,
//!         inputs: &RecognitionInputs,
//!     ) -> Result<Vec<(String, TensorOutput)>, OCRError> {
//!         let batch = inputs.batch_size();
//!         let data = vec![0.0; batch * self.vocab];
//!         Ok(vec![(
//!             "softmax".to_string(),
//!             TensorOutput::F32 {
//!                 shape: vec![batch as i64, 1, self.vocab as i64],
//!                 data,
//!             },
//!         )])
//!     }
//! }
//! ```

use crate::core::OCRError;
use crate::core::batch::{Tensor4D, TensorD};
use crate::core::inference::TensorOutput;
use crate::processors::SrnAuxiliaryInputs;
use std::fmt::Debug;

/// A normalized batch as handed to a [`Predictor`].
#[derive(Debug, Clone)]
pub struct RecognitionInputs {
    /// Image batch, (B, C, H, W).
    pub image: Tensor4D,
    /// Positional and attention-bias tensors, replicated per image. Only
    /// present for the structure-aware algorithm.
    pub auxiliary: Option<SrnAuxiliaryInputs>,
}

impl RecognitionInputs {
    pub fn new(image: Tensor4D) -> Self {
        Self {
            image,
            auxiliary: None,
        }
    }

    pub fn with_auxiliary(mut self, auxiliary: SrnAuxiliaryInputs) -> Self {
        self.auxiliary = Some(auxiliary);
        self
    }

    pub fn batch_size(&self) -> usize {
        self.image.shape()[0]
    }
}

/// Runs a recognition model on one normalized batch.
///
/// Returns every model output as `(name, tensor)` in the model's declared
/// output order. The recognizer picks the score tensor by position, so
/// implementations must not reorder outputs.
pub trait Predictor: Send + Sync + Debug {
    fn predict(&self, inputs: &RecognitionInputs)
    -> Result<Vec<(String, TensorOutput)>, OCRError>;

    /// Name used in logs and errors.
    fn model_name(&self) -> &str {
        "unknown_model"
    }
}

/// Turns a score tensor into one `(text, confidence)` pair per batch row.
///
/// Entries must come back in row order. `batch_size` is the number of images
/// in the group that produced `scores`.
pub trait Decoder: Send + Sync + Debug {
    fn decode(&self, scores: &TensorD, batch_size: usize) -> Result<Vec<(String, f32)>, OCRError>;
}

/// Maps text onto 0-based dictionary positions.
///
/// Characters outside the dictionary are skipped. Vocabulary index 0 is the
/// model's reserved class, so a dictionary position `p` is vocabulary index `p + 1`.
pub trait CharacterEncoder: Send + Sync + Debug {
    fn encode(&self, text: &str) -> Vec<usize>;
}
