//! Typed boundary between named dense tensors and ONNX Runtime.
//!
//! This crate provides:
//! - tensor contracts discovered from a loaded model
//! - conversion of named `ndarray` tensors into native values and back,
//!   dispatched over the uint8 / float32 input and output types
//! - an inference session that releases every native value on each call
//! - the process-wide runtime environment and its platform library table

mod contract;
mod convert;
mod environment;
mod error;
mod platform;
mod session;
mod tensor;

#[cfg(any(test, feature = "fixtures"))]
pub mod fixtures;

pub use contract::{discover_contracts, ModelContracts, TensorContract};
pub use environment::{EnvironmentLease, EnvironmentPhase, RuntimeEnvironment};
pub use error::{InferenceError, Side};
pub use platform::{current_library, library_for, supported_platforms, NativeLibrary, LIBRARY_DIR};
pub use session::{InferenceSession, OptimizationLevel, SessionOptions};
pub use tensor::{ElementType, NamedTensors, Tensor};

/// Result type for inference operations.
pub type Result<T> = std::result::Result<T, InferenceError>;
