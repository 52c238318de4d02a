//! The core module of the recognition pipeline.
//!
//! This module contains the fundamental components of the pipeline, including:
//! - Batch planning and tensor aliases
//! - Configuration management
//! - Constants used throughout the pipeline
//! - Error handling
//! - ONNX Runtime integration
//! - Traits for the predictor, decoder and character encoder collaborators
//!
//! It also provides re-exports of commonly used types for convenience.

pub mod batch;
pub mod config;
pub mod constants;
pub mod errors;
pub mod inference;
pub mod traits;

pub use batch::{BatchGroup, BatchPlan, Tensor3D, Tensor4D, TensorD, aspect_ratio};
pub use config::{
    CharacterType, ConfigError, ConfigValidator, ConfigValidatorExt, Geometry, RecAlgorithm,
    RecognizerConfig,
};
pub use constants::*;
pub use errors::{OCRError, OcrResult, ProcessingStage};
pub use inference::{OrtInfer, TensorInput, TensorOutput};
pub use traits::{CharacterEncoder, Decoder, Predictor, RecognitionInputs};
