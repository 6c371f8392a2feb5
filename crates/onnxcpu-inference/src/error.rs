//! Error types for the inference layer.

use thiserror::Error;

use crate::tensor::ElementType;

/// Which side of a model a tensor contract belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Input,
    Output,
}

impl std::fmt::Display for Side {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Side::Input => write!(f, "input"),
            Side::Output => write!(f, "output"),
        }
    }
}

/// Errors that can occur at the boundary with ONNX Runtime.
#[derive(Error, Debug)]
pub enum InferenceError {
    /// The model file could not be parsed as a valid ONNX model.
    #[error("failed to load model: {0}")]
    ModelLoad(String),

    /// A tensor uses an element type outside {uint8, float32}.
    #[error("{side} tensor {name:?} has unsupported type {dtype}, only uint8 and float32 are supported")]
    UnsupportedType {
        side: Side,
        name: String,
        dtype: String,
    },

    /// Tensors on one side of the model do not share an element type.
    #[error("all {side} tensors must share one data type: {first} was declared first but {name:?} is {other}")]
    MixedType {
        side: Side,
        first: ElementType,
        other: ElementType,
        name: String,
    },

    /// No native library is known for this OS and architecture.
    #[error("unable to find a version of the onnxruntime library supporting {os} {arch}")]
    UnsupportedPlatform { os: String, arch: String },

    /// The process-wide runtime environment could not be initialized.
    #[error("failed to initialize runtime environment: {0}")]
    Environment(String),

    /// Failed to create an inference session.
    #[error("failed to create session: {0}")]
    SessionCreate(String),

    /// A tensor required by the model was not supplied.
    #[error("input tensor with name {name:?} is required")]
    MissingInput { name: String },

    /// A supplied tensor has the wrong element type.
    #[error("input tensor {name:?} is of type {actual}, not {expected}")]
    TypeMismatch {
        name: String,
        expected: ElementType,
        actual: ElementType,
    },

    /// A supplied tensor could not be wrapped as a native value.
    #[error("input tensor {name:?} encountered an error: {reason}")]
    InvalidInput { name: String, reason: String },

    /// The engine failed while running the graph.
    #[error("failed to run inference: {0}")]
    InferenceExecution(String),

    /// Output tensor extraction failed.
    #[error("failed to extract output: {0}")]
    OutputExtraction(String),

    /// Releasing a native resource failed.
    #[error("failed to release {resource}: {reason}")]
    Release { resource: String, reason: String },

    /// I/O error when loading model files.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
