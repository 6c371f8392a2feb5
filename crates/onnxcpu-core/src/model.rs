//! ML model service backed by ONNX Runtime on the CPU.

use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use onnxcpu_inference::{EnvironmentLease, InferenceSession, NamedTensors, RuntimeEnvironment};
use tracing::{debug, info, warn};

use crate::config::ModelConfig;
use crate::error::{OnnxCpuError, Result};
use crate::metadata::ModelMetadata;
use crate::service::MlModelService;

/// Resources held while the service is usable. The session is declared
/// before the lease so it is dropped first.
struct Ready {
    session: InferenceSession,
    lease: EnvironmentLease,
}

/// Runs one ONNX model.
///
/// Inference calls on one instance are serialized. `close` waits for calls in
/// flight and releases the session before the environment lease.
pub struct OnnxCpuModel {
    name: String,
    metadata: ModelMetadata,
    state: RwLock<Option<Ready>>,
}

impl OnnxCpuModel {
    /// Build the service on the process-wide runtime environment.
    pub fn new(config: &ModelConfig) -> Result<Self> {
        Self::with_environment(config, RuntimeEnvironment::global())
    }

    /// Build the service on a given runtime environment.
    ///
    /// Nothing is left allocated if this fails.
    pub fn with_environment(config: &ModelConfig, env: &'static RuntimeEnvironment) -> Result<Self> {
        config.validate()?;
        if !config.model_path.is_file() {
            return Err(OnnxCpuError::config(
                "model_path",
                format!("model file not found: {}", config.model_path.display()),
            ));
        }

        let lease = env.acquire()?;
        let session = InferenceSession::from_file(&config.model_path, &config.runtime.session_options())?;
        let metadata = ModelMetadata::build(session.contracts(), &config.label_reference());

        info!(
            "Loaded model {} as {:?}: {} inputs, {} outputs",
            config.model_path.display(),
            config.name,
            metadata.inputs.len(),
            metadata.outputs.len()
        );

        Ok(Self {
            name: config.name.clone(),
            metadata,
            state: RwLock::new(Some(Ready { session, lease })),
        })
    }

    fn read_state(&self) -> RwLockReadGuard<'_, Option<Ready>> {
        // A panic elsewhere cannot leave the Option half-written.
        self.state.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write_state(&self) -> RwLockWriteGuard<'_, Option<Ready>> {
        self.state.write().unwrap_or_else(|e| e.into_inner())
    }

    pub fn is_closed(&self) -> bool {
        self.read_state().is_none()
    }
}

impl MlModelService for OnnxCpuModel {
    fn name(&self) -> &str {
        &self.name
    }

    fn metadata(&self) -> Result<&ModelMetadata> {
        if self.is_closed() {
            return Err(OnnxCpuError::Closed);
        }
        Ok(&self.metadata)
    }

    fn infer(&self, tensors: &NamedTensors) -> Result<NamedTensors> {
        let state = self.read_state();
        let ready = state.as_ref().ok_or(OnnxCpuError::Closed)?;
        Ok(ready.session.run(tensors)?)
    }

    fn close(&self) -> Result<()> {
        let Some(Ready { session, lease }) = self.write_state().take() else {
            debug!("{} already closed", self.name);
            return Ok(());
        };

        let result = session.close();
        if let Err(e) = &result {
            warn!("Session of {} released with error: {}", self.name, e);
        }
        drop(lease);
        info!("Closed {}", self.name);

        result.map_err(OnnxCpuError::from)
    }
}

impl std::fmt::Debug for OnnxCpuModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OnnxCpuModel")
            .field("name", &self.name)
            .field("metadata", &self.metadata)
            .field("closed", &self.is_closed())
            .finish()
    }
}
