//! ONNX Runtime inference engine for recognition models.

use super::session::load_session_with;
use super::tensor::{TensorInput, TensorOutput};
use crate::core::config::{OrtExecutionProvider, OrtGraphOptimizationLevel, OrtSessionConfig};
use crate::core::errors::OCRError;
use crate::core::traits::{Predictor, RecognitionInputs};
use ort::execution_providers::ExecutionProviderDispatch;
use ort::logging::LogLevel;
use ort::session::{Session, SessionInputs, builder::SessionBuilder};
use std::borrow::Cow;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::debug;

/// An ONNX Runtime session serving a recognition model.
///
/// Inputs are bound to the model's declared inputs by position: the image
/// batch first, then (for the structure-aware model) encoder positions,
/// decoder positions and the two attention biases.
pub struct OrtInfer {
    session: Mutex<Session>,
    input_names: Vec<String>,
    output_names: Vec<String>,
    model_path: PathBuf,
    model_name: String,
}

impl std::fmt::Debug for OrtInfer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OrtInfer")
            .field("input_names", &self.input_names)
            .field("output_names", &self.output_names)
            .field("model_path", &self.model_path)
            .field("model_name", &self.model_name)
            .finish()
    }
}

impl OrtInfer {
    /// Creates a new OrtInfer instance with default ONNX Runtime settings.
    pub fn new(model_path: impl AsRef<Path>) -> Result<Self, OCRError> {
        Self::from_config(model_path, None, None)
    }

    /// Creates a new OrtInfer instance, applying the ORT session configuration
    /// when one is given.
    ///
    /// The model name defaults to the file stem of `model_path`.
    pub fn from_config(
        model_path: impl AsRef<Path>,
        model_name: Option<&str>,
        ort_config: Option<&OrtSessionConfig>,
    ) -> Result<Self, OCRError> {
        let path = model_path.as_ref();
        let session = load_session_with(
            path,
            |builder| match ort_config {
                Some(cfg) => Self::apply_ort_config(builder, cfg),
                None => builder.with_log_level(LogLevel::Error),
            },
            Some("check device/EP configuration and model file"),
        )?;

        let input_names: Vec<String> = session.inputs.iter().map(|i| i.name.clone()).collect();
        let output_names: Vec<String> = session.outputs.iter().map(|o| o.name.clone()).collect();

        let model_name = model_name
            .map(str::to_string)
            .or_else(|| {
                path.file_stem()
                    .and_then(|s| s.to_str())
                    .map(|s| s.to_string())
            })
            .unwrap_or_else(|| "unknown_model".to_string());

        debug!(
            model = %model_name,
            inputs = ?input_names,
            outputs = ?output_names,
            "loaded recognition model"
        );

        Ok(OrtInfer {
            session: Mutex::new(session),
            input_names,
            output_names,
            model_path: path.to_path_buf(),
            model_name,
        })
    }

    /// Returns the model path associated with this inference engine.
    pub fn model_path(&self) -> &Path {
        &self.model_path
    }

    /// Declared input names, in model order.
    pub fn input_names(&self) -> &[String] {
        &self.input_names
    }

    /// Runs the model with positionally bound inputs and returns every output.
    ///
    /// Outputs are returned as `(name, tensor)` pairs in the model's declared
    /// order. No assumption is made about their meaning or shape.
    pub fn infer(&self, inputs: &[TensorInput]) -> Result<Vec<(String, TensorOutput)>, OCRError> {
        if inputs.is_empty() {
            return Err(OCRError::InvalidInput {
                message: "No inputs provided for inference".to_string(),
            });
        }
        if inputs.len() != self.input_names.len() {
            return Err(OCRError::inference_mismatch(
                &self.model_name,
                format!(
                    "model declares {} inputs ({}), got {}",
                    self.input_names.len(),
                    self.input_names.join(", "),
                    inputs.len()
                ),
            ));
        }

        let input_shape = inputs[0].shape();
        let context = format!("forward pass with input shape {:?}", input_shape);

        let values = inputs
            .iter()
            .zip(&self.input_names)
            .map(|(tensor, name)| {
                tensor
                    .to_session_value()
                    .map(|value| (Cow::Borrowed(name.as_str()), value))
            })
            .collect::<Result<Vec<_>, _>>()?;

        let mut session = self.session.lock().map_err(|_| {
            OCRError::inference_mismatch(&self.model_name, "session lock poisoned")
        })?;

        let outputs = session
            .run(SessionInputs::<'_, '_, 0>::ValueMap(values))
            .map_err(|e| OCRError::inference_error(&self.model_name, &context, e))?;

        let mut results = Vec::with_capacity(self.output_names.len());
        for name in &self.output_names {
            let value = &outputs[name.as_str()];

            let tensor = if let Ok((shape, data)) = value.try_extract_tensor::<f32>() {
                TensorOutput::F32 {
                    shape: shape.iter().copied().collect(),
                    data: data.to_vec(),
                }
            } else if let Ok((shape, data)) = value.try_extract_tensor::<i64>() {
                TensorOutput::I64 {
                    shape: shape.iter().copied().collect(),
                    data: data.to_vec(),
                }
            } else if let Ok((shape, data)) = value.try_extract_tensor::<i32>() {
                TensorOutput::I64 {
                    shape: shape.iter().copied().collect(),
                    data: data.iter().map(|&v| v as i64).collect(),
                }
            } else {
                return Err(OCRError::inference_mismatch(
                    &self.model_name,
                    format!(
                        "unsupported output type for tensor '{}'; only f32, i64 and i32 are supported",
                        name
                    ),
                ));
            };

            results.push((name.clone(), tensor));
        }

        Ok(results)
    }

    fn apply_ort_config(
        mut builder: SessionBuilder,
        cfg: &OrtSessionConfig,
    ) -> Result<SessionBuilder, ort::Error> {
        builder = builder.with_log_level(LogLevel::Error)?;
        if let Some(intra) = cfg.intra_threads {
            builder = builder.with_intra_threads(intra)?;
        }
        if let Some(inter) = cfg.inter_threads {
            builder = builder.with_inter_threads(inter)?;
        }
        if let Some(level) = cfg.optimization_level {
            use ort::session::builder::GraphOptimizationLevel as GOL;
            let mapped = match level {
                OrtGraphOptimizationLevel::DisableAll => GOL::Disable,
                OrtGraphOptimizationLevel::Level1 => GOL::Level1,
                OrtGraphOptimizationLevel::Level2 => GOL::Level2,
                OrtGraphOptimizationLevel::Level3 => GOL::Level3,
            };
            builder = builder.with_optimization_level(mapped)?;
        }
        if let Some(eps) = &cfg.execution_providers {
            let providers = Self::build_execution_providers(eps);
            if !providers.is_empty() {
                builder = builder.with_execution_providers(providers)?;
            }
        }
        Ok(builder)
    }

    fn build_execution_providers(eps: &[OrtExecutionProvider]) -> Vec<ExecutionProviderDispatch> {
        let mut providers = Vec::new();

        for ep in eps {
            match ep {
                OrtExecutionProvider::CPU => {
                    providers.push(ort::execution_providers::CPUExecutionProvider::default().build());
                }
                #[cfg(feature = "cuda")]
                OrtExecutionProvider::CUDA { device_id } => {
                    let mut cuda_provider =
                        ort::execution_providers::CUDAExecutionProvider::default();
                    if let Some(id) = device_id {
                        cuda_provider = cuda_provider.with_device_id(*id);
                    }
                    providers.push(cuda_provider.build());
                }
                #[cfg(not(feature = "cuda"))]
                OrtExecutionProvider::CUDA { .. } => {
                    tracing::error!("CUDA execution provider requested but the cuda feature is not enabled; using CPU");
                }
            }
        }

        providers
    }
}

impl Predictor for OrtInfer {
    fn predict(
        &self,
        inputs: &RecognitionInputs,
    ) -> Result<Vec<(String, TensorOutput)>, OCRError> {
        match &inputs.auxiliary {
            None => self.infer(&[TensorInput::Array4(&inputs.image)]),
            Some(aux) => self.infer(&[
                TensorInput::Array4(&inputs.image),
                TensorInput::Array3I64(&aux.encoder_positions),
                TensorInput::Array3I64(&aux.decoder_positions),
                TensorInput::Array4(&aux.attention_bias_upper),
                TensorInput::Array4(&aux.attention_bias_lower),
            ]),
        }
    }

    fn model_name(&self) -> &str {
        &self.model_name
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_model_fails_to_load() {
        let dir = tempfile::tempdir().unwrap();
        let err = OrtInfer::new(dir.path().join("missing.onnx")).unwrap_err();
        assert!(matches!(err, OCRError::ModelLoad { .. }));
    }

    #[test]
    fn test_cpu_provider_is_built() {
        let providers = OrtInfer::build_execution_providers(&[OrtExecutionProvider::CPU]);
        assert_eq!(providers.len(), 1);
    }
}
