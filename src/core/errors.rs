//! Error types for the recognition pipeline.
//!
//! This module defines the errors that can occur while batching, normalizing,
//! predicting and decoding text-line crops. Every failure is terminal for the
//! current call: nothing in this crate retries.

use thiserror::Error;

/// Enum representing different stages of processing in the recognition pipeline.
///
/// This enum is used to identify which stage an error occurred in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessingStage {
    /// Error occurred during tensor operations.
    TensorOperation,
    /// Error occurred while decoding model scores.
    PostProcessing,
}

impl std::fmt::Display for ProcessingStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProcessingStage::TensorOperation => write!(f, "tensor operation"),
            ProcessingStage::PostProcessing => write!(f, "post-processing"),
        }
    }
}

/// Enum representing the errors that can occur in the recognition pipeline.
#[derive(Error, Debug)]
pub enum OCRError {
    /// Error occurred while loading an image.
    #[error("image load")]
    ImageLoad(#[source] image::ImageError),

    /// Error occurred during processing.
    #[error("{kind} failed: {context}")]
    Processing {
        /// The stage of processing where the error occurred.
        kind: ProcessingStage,
        /// Additional context about the error.
        context: String,
        /// The underlying error that caused this error.
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// The model file could not be turned into an inference session.
    #[error("failed to load model '{model_path}': {reason}{suggestion}")]
    ModelLoad {
        /// Path of the model file.
        model_path: String,
        /// What went wrong.
        reason: String,
        /// Optional hint, already formatted as "; suggested fix: ...".
        suggestion: String,
        /// The underlying runtime error, if any.
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// The predictor (or the decoder consuming its output) failed.
    ///
    /// Usually a model/configuration mismatch, e.g. a fixed-shape model fed a
    /// different geometry. Never retried.
    #[error("inference failed for model '{model_name}': {context}")]
    Inference {
        /// Name of the model that failed.
        model_name: String,
        /// Additional context (batch index, input shape, ...).
        context: String,
        /// The underlying error that caused this error.
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Error indicating invalid input (bad image, malformed shape string, ...).
    #[error("invalid input: {message}")]
    InvalidInput {
        /// A message describing the invalid input.
        message: String,
    },

    /// The configured recognition algorithm is not known.
    #[error("unsupported recognition algorithm: '{name}'")]
    UnsupportedAlgorithm {
        /// The algorithm name as configured.
        name: String,
    },

    /// Error indicating a configuration problem.
    #[error("configuration: {message}")]
    ConfigError {
        /// A message describing the configuration error.
        message: String,
    },

    /// Error from the ONNX Runtime session.
    #[error(transparent)]
    Session(#[from] ort::Error),

    /// Error from tensor operations.
    #[error("tensor operation")]
    Tensor(#[from] ndarray::ShapeError),

    /// IO error.
    #[error("io")]
    Io(#[from] std::io::Error),
}

/// Convenient result alias for recognition operations.
pub type OcrResult<T> = Result<T, OCRError>;

impl OCRError {
    /// Creates an OCRError for tensor operations.
    pub fn tensor_operation(
        context: &str,
        error: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::processing_error(ProcessingStage::TensorOperation, context, error)
    }

    /// Creates an OCRError for processing operations.
    ///
    /// # Arguments
    ///
    /// * `kind` - The stage of processing where the error occurred.
    /// * `context` - Additional context about the error.
    /// * `error` - The underlying error that caused this error.
    pub fn processing_error(
        kind: ProcessingStage,
        context: &str,
        error: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::Processing {
            kind,
            context: context.to_string(),
            source: Box::new(error),
        }
    }

    /// Creates an OCRError for a model that failed to load.
    pub fn model_load_error(
        model_path: impl AsRef<std::path::Path>,
        reason: impl Into<String>,
        suggestion: Option<&str>,
        source: Option<impl std::error::Error + Send + Sync + 'static>,
    ) -> Self {
        let suggestion = suggestion
            .map(|s| format!("; suggested fix: {}", s))
            .unwrap_or_default();
        Self::ModelLoad {
            model_path: model_path.as_ref().display().to_string(),
            reason: reason.into(),
            suggestion,
            source: source.map(|e| Box::new(e) as _),
        }
    }

    /// Creates an OCRError for a failed predictor call.
    pub fn inference_error(
        model_name: impl Into<String>,
        context: impl Into<String>,
        error: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::Inference {
            model_name: model_name.into(),
            context: context.into(),
            source: Box::new(error),
        }
    }

    /// Creates an inference error that has no underlying error value, only a
    /// description (unexpected output count, shape, row count, ...).
    pub fn inference_mismatch(model_name: impl Into<String>, message: impl Into<String>) -> Self {
        let message = message.into();
        Self::Inference {
            model_name: model_name.into(),
            context: message.clone(),
            source: message.into(),
        }
    }

    /// Creates an OCRError for invalid input.
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput {
            message: message.into(),
        }
    }

    /// Creates an OCRError for an unknown algorithm name.
    pub fn unsupported_algorithm(name: impl Into<String>) -> Self {
        Self::UnsupportedAlgorithm { name: name.into() }
    }

    /// Creates an OCRError for configuration errors.
    pub fn config_error(message: impl Into<String>) -> Self {
        Self::ConfigError {
            message: message.into(),
        }
    }

    /// Creates an OCRError for configuration errors with context.
    ///
    /// # Arguments
    ///
    /// * `field` - The field where the error occurred.
    /// * `value` - The value of the field.
    /// * `reason` - The reason for the error.
    pub fn config_error_with_context(field: &str, value: &str, reason: &str) -> Self {
        Self::ConfigError {
            message: format!(
                "Configuration error in field '{}' with value '{}': {}",
                field, value, reason
            ),
        }
    }
}

impl From<image::ImageError> for OCRError {
    fn from(error: image::ImageError) -> Self {
        Self::ImageLoad(error)
    }
}

impl From<crate::core::config::ConfigError> for OCRError {
    fn from(error: crate::core::config::ConfigError) -> Self {
        Self::ConfigError {
            message: error.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error;

    #[test]
    fn test_processing_error_display_and_source() {
        let err = OCRError::processing_error(
            ProcessingStage::PostProcessing,
            "reshaping scores",
            std::io::Error::new(std::io::ErrorKind::InvalidData, "bad length"),
        );
        assert_eq!(err.to_string(), "post-processing failed: reshaping scores");
        assert!(err.source().is_some());
    }

    #[test]
    fn test_inference_mismatch_keeps_message_as_source() {
        let err = OCRError::inference_mismatch("crnn", "expected 4 rows, got 3");
        assert!(err.to_string().contains("crnn"));
        let source = err.source().map(|s| s.to_string());
        assert_eq!(source.as_deref(), Some("expected 4 rows, got 3"));
    }

    #[test]
    fn test_unsupported_algorithm_names_the_algorithm() {
        let err = OCRError::unsupported_algorithm("NRTR");
        assert!(matches!(err, OCRError::UnsupportedAlgorithm { ref name } if name == "NRTR"));
        assert!(err.to_string().contains("NRTR"));
    }

    #[test]
    fn test_config_error_conversion() {
        let err: OCRError = crate::core::config::ConfigError::InvalidBatchSize.into();
        assert!(matches!(err, OCRError::ConfigError { .. }));
    }

    #[test]
    fn test_model_load_error_formats_suggestion() {
        let err = OCRError::model_load_error(
            "models/rec.onnx",
            "failed to create ONNX session",
            Some("verify model path"),
            None::<std::io::Error>,
        );
        assert_eq!(
            err.to_string(),
            "failed to load model 'models/rec.onnx': failed to create ONNX session; suggested fix: verify model path"
        );
        assert!(err.source().is_none());
    }
}
