//! CLI subcommands.

pub mod config;
pub mod infer;
pub mod metadata;
pub mod platform;

use std::path::{Path, PathBuf};

use clap::Args;
use tracing::debug;

use onnxcpu_core::{ModelConfig, OnnxCpuModel};

/// Model selection shared by commands that load a model.
#[derive(Args)]
pub struct ModelArgs {
    /// Model file (overrides the config file)
    #[arg(short, long)]
    model: Option<PathBuf>,

    /// Label file (overrides the config file)
    #[arg(short, long)]
    labels: Option<PathBuf>,
}

impl ModelArgs {
    /// Merge the command line over the config file.
    ///
    /// Without `-c`, the default config file is used when it exists.
    pub fn resolve(&self, config_path: Option<&str>) -> anyhow::Result<ModelConfig> {
        let mut config = match config_path {
            Some(path) => ModelConfig::from_file(Path::new(path))?,
            None => {
                let path = default_config_path();
                if path.exists() {
                    ModelConfig::from_file(&path)?
                } else {
                    ModelConfig::default()
                }
            }
        };

        if let Some(model) = &self.model {
            config.model_path = model.clone();
        }
        if let Some(labels) = &self.labels {
            config.label_path = Some(labels.clone());
        }

        config.validate()?;
        debug!("Resolved model config: {:?}", config);
        Ok(config)
    }
}

/// Location of the config file when `-c` is not given.
pub fn default_config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("onnxcpu")
        .join("config.json")
}

/// Load the model off the async runtime.
pub async fn open_model(config: ModelConfig) -> anyhow::Result<OnnxCpuModel> {
    let model = tokio::task::spawn_blocking(move || OnnxCpuModel::new(&config)).await??;
    Ok(model)
}
