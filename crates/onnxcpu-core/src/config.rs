//! Configuration for the ML model service.

use std::path::{Path, PathBuf};

use onnxcpu_inference::{OptimizationLevel, SessionOptions};
use serde::{Deserialize, Serialize};

use crate::error::{OnnxCpuError, Result};

/// Extension every model file must carry.
pub const MODEL_EXTENSION: &str = "onnx";

/// Service configuration: which model to run and how.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    /// Name the service reports.
    pub name: String,

    /// Path to the `.onnx` file. Required.
    pub model_path: PathBuf,

    /// Path to a newline-delimited label file. Passed through to metadata.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label_path: Option<PathBuf>,

    /// Engine settings.
    pub runtime: RuntimeConfig,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            name: "onnx-cpu".to_string(),
            model_path: PathBuf::new(),
            label_path: None,
            runtime: RuntimeConfig::default(),
        }
    }
}

/// Graph optimization level, as written in config files.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GraphOptimization {
    Disable,
    Basic,
    Extended,
    #[default]
    All,
}

impl From<GraphOptimization> for OptimizationLevel {
    fn from(level: GraphOptimization) -> Self {
        match level {
            GraphOptimization::Disable => OptimizationLevel::Disable,
            GraphOptimization::Basic => OptimizationLevel::Basic,
            GraphOptimization::Extended => OptimizationLevel::Extended,
            GraphOptimization::All => OptimizationLevel::All,
        }
    }
}

/// Engine configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    /// Number of threads used inside one operator.
    pub intra_threads: usize,

    /// Graph optimization level.
    pub optimization_level: GraphOptimization,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            intra_threads: 4,
            optimization_level: GraphOptimization::All,
        }
    }
}

impl RuntimeConfig {
    pub fn session_options(&self) -> SessionOptions {
        SessionOptions {
            intra_threads: self.intra_threads,
            optimization: self.optimization_level.into(),
        }
    }
}

impl ModelConfig {
    /// Configuration for the model at `model_path` with default settings.
    pub fn new(model_path: impl Into<PathBuf>) -> Self {
        Self {
            model_path: model_path.into(),
            ..Self::default()
        }
    }

    /// Attach a label file.
    pub fn with_labels(mut self, label_path: impl Into<PathBuf>) -> Self {
        self.label_path = Some(label_path.into());
        self
    }

    /// Check the configuration before a service is built from it.
    ///
    /// The model file's existence is not checked here.
    pub fn validate(&self) -> Result<()> {
        if self.model_path.as_os_str().is_empty() {
            return Err(OnnxCpuError::config("model_path", "field is required"));
        }

        let ext = self.model_path.extension().and_then(|e| e.to_str());
        if ext != Some(MODEL_EXTENSION) {
            let base = self
                .model_path
                .file_name()
                .map(|f| f.to_string_lossy().into_owned())
                .unwrap_or_default();
            return Err(OnnxCpuError::config(
                "model_path",
                format!("filename must end in .{MODEL_EXTENSION}, the filename is {base}"),
            ));
        }

        if self.runtime.intra_threads == 0 {
            return Err(OnnxCpuError::config("runtime.intra_threads", "must be at least 1"));
        }

        if let Some(label_path) = &self.label_path {
            if label_path.to_str().is_none() {
                return Err(OnnxCpuError::config("label_path", "path must be valid UTF-8"));
            }
        }

        Ok(())
    }

    /// Label path as recorded in metadata: the path, or empty.
    ///
    /// Exact for any config that passed [`ModelConfig::validate`].
    pub fn label_reference(&self) -> String {
        self.label_path
            .as_deref()
            .map(|p| p.to_string_lossy().into_owned())
            .unwrap_or_default()
    }

    /// Load configuration from a JSON file.
    pub fn from_file(path: &Path) -> std::result::Result<Self, std::io::Error> {
        let content = std::fs::read_to_string(path)?;
        serde_json::from_str(&content).map_err(|e| {
            std::io::Error::new(std::io::ErrorKind::InvalidData, e.to_string())
        })
    }

    /// Save configuration to a JSON file.
    pub fn save(&self, path: &Path) -> std::result::Result<(), std::io::Error> {
        let content = serde_json::to_string_pretty(self).map_err(|e| {
            std::io::Error::new(std::io::ErrorKind::InvalidData, e.to_string())
        })?;
        std::fs::write(path, content)
    }
}
