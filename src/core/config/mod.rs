//! Configuration management for the recognition pipeline.
//!
//! This module provides configuration types, validation traits, and utilities
//! for describing a text recognizer: model geometry, algorithm selection,
//! character filtering and ONNX Runtime session settings.

pub mod errors;
pub mod onnx;
pub mod recognizer;

pub use errors::{ConfigError, ConfigValidator, ConfigValidatorExt};
pub use onnx::*;
pub use recognizer::{CharacterType, Geometry, RecAlgorithm, RecognizerConfig};
