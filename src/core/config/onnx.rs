//! ONNX Runtime configuration types and utilities.

use serde::{Deserialize, Serialize};

use crate::core::OCRError;

/// Graph optimization levels for ONNX Runtime.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrtGraphOptimizationLevel {
    /// Disable all optimizations.
    DisableAll,
    /// Enable basic optimizations.
    #[default]
    Level1,
    /// Enable extended optimizations.
    Level2,
    /// Enable all optimizations.
    Level3,
}

/// Execution providers for ONNX Runtime.
///
/// The device a model runs on is a detail of the ONNX adapter only; the
/// recognizer never looks at it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrtExecutionProvider {
    /// CPU execution provider (always available)
    #[default]
    CPU,
    /// NVIDIA CUDA execution provider
    CUDA {
        /// CUDA device ID (default: 0)
        device_id: Option<i32>,
    },
}

impl OrtExecutionProvider {
    /// Parses a device string (`cpu`, `cuda`, `cuda:N`) into execution providers
    /// in order of preference. CUDA requests always keep CPU as the fallback.
    pub fn from_device(device: &str) -> Result<Vec<Self>, OCRError> {
        let device = device.trim().to_lowercase();

        if device == "cpu" {
            return Ok(vec![Self::CPU]);
        }
        if device == "cuda" || device == "gpu" {
            return Ok(vec![Self::CUDA { device_id: Some(0) }, Self::CPU]);
        }
        if let Some(id) = device.strip_prefix("cuda:") {
            let device_id: i32 = id.parse().map_err(|_| {
                OCRError::config_error_with_context("device", &device, "invalid CUDA device ID")
            })?;
            return Ok(vec![
                Self::CUDA {
                    device_id: Some(device_id),
                },
                Self::CPU,
            ]);
        }

        Err(OCRError::config_error_with_context(
            "device",
            &device,
            "supported devices: cpu, cuda, cuda:N",
        ))
    }
}

/// Configuration for ONNX Runtime sessions.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OrtSessionConfig {
    /// Number of threads used to parallelize execution within nodes
    pub intra_threads: Option<usize>,
    /// Number of threads used to parallelize execution across nodes
    pub inter_threads: Option<usize>,
    /// Graph optimization level
    pub optimization_level: Option<OrtGraphOptimizationLevel>,
    /// Execution providers in order of preference
    pub execution_providers: Option<Vec<OrtExecutionProvider>>,
}

impl OrtSessionConfig {
    /// Creates a new OrtSessionConfig with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the number of intra-op threads.
    pub fn with_intra_threads(mut self, threads: usize) -> Self {
        self.intra_threads = Some(threads);
        self
    }

    /// Sets the number of inter-op threads.
    pub fn with_inter_threads(mut self, threads: usize) -> Self {
        self.inter_threads = Some(threads);
        self
    }

    /// Sets the graph optimization level.
    pub fn with_optimization_level(mut self, level: OrtGraphOptimizationLevel) -> Self {
        self.optimization_level = Some(level);
        self
    }

    /// Sets the execution providers.
    pub fn with_execution_providers(mut self, providers: Vec<OrtExecutionProvider>) -> Self {
        self.execution_providers = Some(providers);
        self
    }
}
