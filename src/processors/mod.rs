//! Image and tensor processing for text-line recognition.
//!
//! # Modules
//!
//! * `normalization` - Per-channel affine pixel normalization into CHW canvases
//! * `resize_recognition` - Resize and pad for the standard (CTC, attention) algorithms
//! * `srn` - Grayscale resize and auxiliary position/bias tensors for SRN
//! * `char_mask` - Allow/deny-list masking of score tensors
//! * `decode` - Greedy label decoders turning score tensors into text

pub mod char_mask;
pub mod decode;
pub mod normalization;
pub mod resize_recognition;
pub mod srn;

pub use char_mask::CharacterMask;
pub use decode::{AttnLabelDecode, BaseRecLabelDecode, CTCLabelDecode, SRNLabelDecode};
pub use normalization::NormalizeImage;
pub use resize_recognition::OCRResize;
pub use srn::{SrnAuxiliaryInputs, SrnResize};
