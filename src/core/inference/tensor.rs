//! Backend-agnostic tensor inputs and outputs for inference.

use crate::core::errors::OCRError;
use ndarray::{Array3, Array4, ArrayD, IxDyn};
use ort::session::SessionInputValue;
use ort::value::TensorRef;

/// A borrowed model input.
///
/// Recognition models take an f32 image batch; the structure-aware model
/// additionally takes i64 position indices and f32 attention biases.
#[derive(Debug, Clone, Copy)]
pub enum TensorInput<'a> {
    /// A 4D f32 tensor reference (image batch, attention bias)
    Array4(&'a Array4<f32>),
    /// A 3D i64 tensor reference (position indices)
    Array3I64(&'a Array3<i64>),
}

impl<'a> TensorInput<'a> {
    /// Returns the shape of the tensor as a vector.
    pub fn shape(&self) -> Vec<usize> {
        match self {
            TensorInput::Array4(arr) => arr.shape().to_vec(),
            TensorInput::Array3I64(arr) => arr.shape().to_vec(),
        }
    }

    /// Converts the input into an ONNX Runtime session value without copying.
    pub(crate) fn to_session_value(self) -> Result<SessionInputValue<'a>, OCRError> {
        let dims: Vec<i64> = self.shape().iter().map(|&d| d as i64).collect();
        let value: SessionInputValue<'a> = match self {
            TensorInput::Array4(arr) => {
                TensorRef::from_array_view((dims, contiguous(arr.as_slice())?))?.into()
            }
            TensorInput::Array3I64(arr) => {
                TensorRef::from_array_view((dims, contiguous(arr.as_slice())?))?.into()
            }
        };
        Ok(value)
    }
}

fn contiguous<T>(data: Option<&[T]>) -> Result<&[T], OCRError> {
    data.ok_or_else(|| OCRError::InvalidInput {
        message: "tensor is not contiguous in memory".to_string(),
    })
}

/// Generic tensor output supporting multiple data types.
///
/// The raw output of an inference engine, without assumptions about its
/// meaning. Callers interpret and validate the shape.
#[derive(Debug, Clone, PartialEq)]
pub enum TensorOutput {
    /// 32-bit floating point tensor
    F32 { shape: Vec<i64>, data: Vec<f32> },
    /// 64-bit integer tensor (i32 outputs are widened)
    I64 { shape: Vec<i64>, data: Vec<i64> },
}

impl TensorOutput {
    /// Returns the shape of the tensor.
    pub fn shape(&self) -> &[i64] {
        match self {
            TensorOutput::F32 { shape, .. } => shape,
            TensorOutput::I64 { shape, .. } => shape,
        }
    }

    /// Returns the number of dimensions.
    pub fn ndim(&self) -> usize {
        self.shape().len()
    }

    /// Returns the total number of elements.
    pub fn len(&self) -> usize {
        self.shape().iter().map(|&d| d.max(0) as usize).product()
    }

    /// Returns true if the tensor has no elements.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Attempts to extract as a dynamic-dimensional f32 array.
    ///
    /// # Errors
    ///
    /// Returns an error if the tensor is not f32, has a negative dimension, or
    /// the data length does not match the shape.
    pub fn try_into_array_f32(self) -> Result<ArrayD<f32>, OCRError> {
        match self {
            TensorOutput::F32 { shape, data } => {
                if shape.iter().any(|&d| d < 0) {
                    return Err(OCRError::InvalidInput {
                        message: format!("tensor has unresolved dimensions: {:?}", shape),
                    });
                }
                let dims: Vec<usize> = shape.iter().map(|&d| d as usize).collect();
                let expected_len: usize = dims.iter().product();
                if data.len() != expected_len {
                    return Err(OCRError::InvalidInput {
                        message: format!(
                            "Data length mismatch: expected {}, got {}",
                            expected_len,
                            data.len()
                        ),
                    });
                }
                ArrayD::from_shape_vec(IxDyn(&dims), data)
                    .map_err(|e| OCRError::tensor_operation("building output tensor", e))
            }
            TensorOutput::I64 { .. } => Err(OCRError::InvalidInput {
                message: "Expected f32 tensor, got i64".to_string(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_f32_output_to_array() {
        let output = TensorOutput::F32 {
            shape: vec![2, 1, 3],
            data: vec![0.0, 1.0, 2.0, 3.0, 4.0, 5.0],
        };
        assert_eq!(output.ndim(), 3);
        assert_eq!(output.len(), 6);

        let array = output.try_into_array_f32().unwrap();
        assert_eq!(array.shape(), &[2, 1, 3]);
        assert_eq!(array[[1, 0, 2]], 5.0);
    }

    #[test]
    fn test_length_mismatch_is_rejected() {
        let output = TensorOutput::F32 {
            shape: vec![2, 3],
            data: vec![0.0; 5],
        };
        assert!(output.try_into_array_f32().is_err());
    }

    #[test]
    fn test_i64_output_is_not_scores() {
        let output = TensorOutput::I64 {
            shape: vec![1, 25],
            data: vec![0; 25],
        };
        assert!(matches!(
            output.try_into_array_f32(),
            Err(OCRError::InvalidInput { .. })
        ));
    }

    #[test]
    fn test_input_shape() {
        let positions = Array3::<i64>::zeros((2, 25, 1));
        assert_eq!(TensorInput::Array3I64(&positions).shape(), vec![2, 25, 1]);
    }
}
