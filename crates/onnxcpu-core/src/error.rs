//! Error types for the onnxcpu-core library.

use thiserror::Error;

/// Main error type for the ML model service.
#[derive(Error, Debug)]
pub enum OnnxCpuError {
    /// A construction input is missing or malformed.
    #[error("invalid configuration for {field}: {reason}")]
    ConfigValidation { field: String, reason: String },

    /// The service was used after it was closed.
    #[error("ML model service is closed")]
    Closed,

    /// Error from the inference layer.
    #[error("inference error: {0}")]
    Inference(#[from] onnxcpu_inference::InferenceError),

    /// Label file could not be read.
    #[error("failed to load labels: {0}")]
    Labels(String),

    /// An image could not be turned into an input tensor.
    #[error("preprocessing failed: {0}")]
    Preprocessing(String),

    /// Image decoding error.
    #[error("image error: {0}")]
    Image(#[from] image::ImageError),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl OnnxCpuError {
    pub(crate) fn config(field: &str, reason: impl Into<String>) -> Self {
        OnnxCpuError::ConfigValidation {
            field: field.to_string(),
            reason: reason.into(),
        }
    }
}

/// Result type for the onnxcpu-core library.
pub type Result<T> = std::result::Result<T, OnnxCpuError>;
