//! ML model service that runs ONNX models on the CPU.
//!
//! This crate provides:
//! - configuration and validation for one model
//! - `OnnxCpuModel`, which loads a model, describes it, runs it and releases it
//! - model metadata with the label file attached to each output
//! - helpers for callers: label files, image tensors, top-k ranking

pub mod classify;
pub mod config;
pub mod error;
pub mod labels;
pub mod metadata;
pub mod model;
pub mod preprocessing;
pub mod service;

#[cfg(test)]
mod scenarios;

pub use classify::{top_k, ClassScore};
pub use config::{GraphOptimization, ModelConfig, RuntimeConfig};
pub use error::{OnnxCpuError, Result};
pub use labels::load_labels;
pub use metadata::{ModelMetadata, TensorInfo};
pub use model::OnnxCpuModel;
pub use preprocessing::{ImageTensorizer, Layout, Normalization};
pub use service::MlModelService;

/// Re-export inference types.
pub use onnxcpu_inference::{
    current_library, supported_platforms, ElementType, InferenceError, NamedTensors, NativeLibrary,
    Tensor,
};
