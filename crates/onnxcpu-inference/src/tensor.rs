//! Tensor types for inference input/output.

use std::collections::HashMap;

use ndarray::{ArrayD, IxDyn, ShapeError};

/// Element types a model may declare on its inputs and outputs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ElementType {
    Uint8,
    Float32,
}

impl ElementType {
    /// Human-readable label, as reported in model metadata.
    pub fn label(&self) -> &'static str {
        match self {
            ElementType::Uint8 => "uint8",
            ElementType::Float32 => "float32",
        }
    }

    /// Parse a label produced by [`ElementType::label`].
    pub fn from_label(label: &str) -> Option<Self> {
        match label {
            "uint8" => Some(ElementType::Uint8),
            "float32" => Some(ElementType::Float32),
            _ => None,
        }
    }
}

impl std::fmt::Display for ElementType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// A dense tensor: element type, shape and row-major backing data.
#[derive(Debug, Clone, PartialEq)]
pub enum Tensor {
    Uint8(ArrayD<u8>),
    Float32(ArrayD<f32>),
}

/// Tensors keyed by the name the model uses for them.
pub type NamedTensors = HashMap<String, Tensor>;

impl Tensor {
    /// Get the shape of the tensor.
    pub fn shape(&self) -> &[usize] {
        match self {
            Tensor::Uint8(arr) => arr.shape(),
            Tensor::Float32(arr) => arr.shape(),
        }
    }

    /// Get the data type of the tensor.
    pub fn dtype(&self) -> ElementType {
        match self {
            Tensor::Uint8(_) => ElementType::Uint8,
            Tensor::Float32(_) => ElementType::Float32,
        }
    }

    /// Number of elements.
    pub fn len(&self) -> usize {
        match self {
            Tensor::Uint8(arr) => arr.len(),
            Tensor::Float32(arr) => arr.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Create a Float32 tensor from raw data and shape.
    pub fn from_f32(data: Vec<f32>, shape: Vec<usize>) -> Result<Self, ShapeError> {
        ArrayD::from_shape_vec(IxDyn(&shape), data).map(Tensor::Float32)
    }

    /// Create a Uint8 tensor from raw data and shape.
    pub fn from_u8(data: Vec<u8>, shape: Vec<usize>) -> Result<Self, ShapeError> {
        ArrayD::from_shape_vec(IxDyn(&shape), data).map(Tensor::Uint8)
    }

    /// Try to get the inner Float32 array.
    pub fn as_f32(&self) -> Option<&ArrayD<f32>> {
        match self {
            Tensor::Float32(arr) => Some(arr),
            _ => None,
        }
    }

    /// Try to get the inner Uint8 array.
    pub fn as_u8(&self) -> Option<&ArrayD<u8>> {
        match self {
            Tensor::Uint8(arr) => Some(arr),
            _ => None,
        }
    }
}

impl From<ArrayD<f32>> for Tensor {
    fn from(arr: ArrayD<f32>) -> Self {
        Tensor::Float32(arr)
    }
}

impl From<ArrayD<u8>> for Tensor {
    fn from(arr: ArrayD<u8>) -> Self {
        Tensor::Uint8(arr)
    }
}
