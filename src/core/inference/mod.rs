//! Structures and helpers for ONNX Runtime inference.
//!
//! [`OrtInfer`] wraps an ONNX Runtime session and implements the
//! [`Predictor`](crate::core::traits::Predictor) trait, so an exported
//! recognition model can be plugged straight into a
//! [`TextRecognizer`](crate::predictor::TextRecognizer).

pub mod ort_infer;
pub mod session;
pub mod tensor;

pub use ort_infer::OrtInfer;
pub use tensor::{TensorInput, TensorOutput};
