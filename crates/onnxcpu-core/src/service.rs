//! The ML model service interface.

use onnxcpu_inference::NamedTensors;

use crate::error::Result;
use crate::metadata::ModelMetadata;

/// A loaded model that can describe itself and run inference.
///
/// Implementations are shared across threads. `infer` blocks until the model
/// has run; callers on an async runtime should move it to a blocking worker.
pub trait MlModelService: Send + Sync {
    /// Name of the service.
    fn name(&self) -> &str;

    /// Metadata computed when the service was built.
    fn metadata(&self) -> Result<&ModelMetadata>;

    /// Run the model.
    ///
    /// # Arguments
    /// * `tensors` - Named input tensors; keys the model does not use are ignored
    ///
    /// # Returns
    /// One tensor per model output, keyed by output name
    fn infer(&self, tensors: &NamedTensors) -> Result<NamedTensors>;

    /// Release the model. Closing twice is a no-op; every other call fails
    /// with [`crate::OnnxCpuError::Closed`] afterwards.
    fn close(&self) -> Result<()>;
}
