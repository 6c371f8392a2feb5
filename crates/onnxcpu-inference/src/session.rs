//! Inference session bound to a model's input and output contracts.

use std::path::Path;
use std::sync::Mutex;

#[cfg(feature = "xnnpack")]
use ort::ep::XNNPACK;
use ort::session::builder::GraphOptimizationLevel;
use ort::session::Session;
use tracing::{debug, info};

use crate::contract::{contracts_of, ModelContracts};
use crate::convert::{self, NativeElement};
use crate::error::InferenceError;
use crate::tensor::{ElementType, NamedTensors};
use crate::Result;

/// Graph optimization applied when the session is created.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OptimizationLevel {
    Disable,
    Basic,
    Extended,
    #[default]
    All,
}

impl From<OptimizationLevel> for GraphOptimizationLevel {
    fn from(level: OptimizationLevel) -> Self {
        match level {
            OptimizationLevel::Disable => GraphOptimizationLevel::Disable,
            OptimizationLevel::Basic => GraphOptimizationLevel::Level1,
            OptimizationLevel::Extended => GraphOptimizationLevel::Level2,
            OptimizationLevel::All => GraphOptimizationLevel::Level3,
        }
    }
}

/// Options handed to the engine when a session is built.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionOptions {
    pub intra_threads: usize,
    pub optimization: OptimizationLevel,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            intra_threads: 4,
            optimization: OptimizationLevel::All,
        }
    }
}

/// Build an engine session from model bytes.
pub(crate) fn load_session(bytes: &[u8], options: &SessionOptions) -> Result<Session> {
    debug!("Loading ONNX model from {} bytes", bytes.len());

    let builder = Session::builder().map_err(|e| InferenceError::SessionCreate(e.to_string()))?;

    #[cfg(feature = "xnnpack")]
    let builder = builder
        .with_execution_providers([XNNPACK::default().build()])
        .map_err(|e| InferenceError::SessionCreate(e.to_string()))?;

    builder
        .with_optimization_level(options.optimization.into())
        .map_err(|e| InferenceError::SessionCreate(e.to_string()))?
        .with_intra_threads(options.intra_threads)
        .map_err(|e| InferenceError::SessionCreate(e.to_string()))?
        .commit_from_memory(bytes)
        .map_err(|e| InferenceError::ModelLoad(e.to_string()))
}

/// One engine session, reused for every call until it is closed.
///
/// Runs are serialized behind a mutex: concurrent callers wait for each other.
/// Native values live only inside one call: inputs are consumed by the engine
/// and outputs are dropped once copied out, on every exit path.
pub struct InferenceSession {
    session: Mutex<Session>,
    contracts: ModelContracts,
}

impl InferenceSession {
    /// Load a model from a file path.
    pub fn from_file<P: AsRef<Path>>(path: P, options: &SessionOptions) -> Result<Self> {
        let path = path.as_ref();
        debug!("Loading ONNX model from: {}", path.display());

        let bytes = std::fs::read(path)?;
        Self::from_bytes(&bytes, options)
    }

    /// Load a model from bytes.
    ///
    /// If the model's contracts are rejected the engine session is dropped
    /// before the error is returned.
    pub fn from_bytes(bytes: &[u8], options: &SessionOptions) -> Result<Self> {
        let session = load_session(bytes, options)?;
        let contracts = contracts_of(&session)?;

        info!(
            "Opened session with inputs {:?} ({}) and outputs {:?} ({})",
            contracts.input_names(),
            contracts
                .input_type()
                .map(|t| t.label())
                .unwrap_or("none"),
            contracts.output_names(),
            contracts.output_type(),
        );

        Ok(Self {
            session: Mutex::new(session),
            contracts,
        })
    }

    pub fn contracts(&self) -> &ModelContracts {
        &self.contracts
    }

    /// Run the model on the named tensors.
    pub fn run(&self, tensors: &NamedTensors) -> Result<NamedTensors> {
        use ElementType::{Float32, Uint8};

        // A model without inputs converts nothing, so any input type will do.
        let input_type = self.contracts.input_type().unwrap_or(Float32);

        match (input_type, self.contracts.output_type()) {
            (Float32, Float32) => self.run_typed::<f32, f32>(tensors),
            (Float32, Uint8) => self.run_typed::<f32, u8>(tensors),
            (Uint8, Float32) => self.run_typed::<u8, f32>(tensors),
            (Uint8, Uint8) => self.run_typed::<u8, u8>(tensors),
        }
    }

    fn run_typed<I: NativeElement, O: NativeElement>(&self, tensors: &NamedTensors) -> Result<NamedTensors> {
        let inputs = convert::to_native::<I>(tensors, self.contracts.inputs())?;

        let mut session = self.session.lock().map_err(|e| {
            InferenceError::InferenceExecution(format!("failed to lock session: {}", e))
        })?;

        let outputs = session
            .run(inputs)
            .map_err(|e| InferenceError::InferenceExecution(e.to_string()))?;

        let mut produced = NamedTensors::with_capacity(outputs.len());
        for (name, value) in outputs.iter() {
            let (shape, data) = value.try_extract_tensor::<O>().map_err(|e| {
                InferenceError::OutputExtraction(format!("output tensor {:?} is not {}: {}", name, O::TYPE, e))
            })?;
            let shape: Vec<usize> = shape.iter().map(|&s| s as usize).collect();
            let tensor = convert::from_native::<O>(&name.to_string(), shape, data)?;
            produced.insert(name.to_string(), tensor);
        }

        convert::ensure_outputs(&produced, self.contracts.outputs())?;

        debug!(
            "Inference produced {:?}",
            produced
                .iter()
                .map(|(n, t)| (n.as_str(), t.shape()))
                .collect::<Vec<_>>()
        );

        Ok(produced)
    }

    /// Destroy the engine session.
    ///
    /// The session is released even when an error is returned.
    pub fn close(self) -> Result<()> {
        match self.session.into_inner() {
            Ok(session) => {
                drop(session);
                Ok(())
            }
            Err(poisoned) => {
                drop(poisoned.into_inner());
                Err(InferenceError::Release {
                    resource: "session".to_string(),
                    reason: "a previous inference call panicked while holding the session".to_string(),
                })
            }
        }
    }
}

impl std::fmt::Debug for InferenceSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InferenceSession")
            .field("contracts", &self.contracts)
            .finish()
    }
}

#[cfg(any(test, feature = "fixtures"))]
impl InferenceSession {
    /// Leave the session lock poisoned, as a run that panicked would.
    pub fn poison(&self) {
        let _ = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            let _guard = self.session.lock();
            panic!("simulated panic while holding the session");
        }));
    }
}
