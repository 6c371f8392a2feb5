//! Metadata command - describe a model's tensors.

use clap::Args;

use onnxcpu_core::MlModelService;

use super::{open_model, ModelArgs};

/// Arguments for the metadata command.
#[derive(Args)]
pub struct MetadataArgs {
    #[command(flatten)]
    model: ModelArgs,
}

pub async fn run(args: MetadataArgs, config_path: Option<&str>) -> anyhow::Result<()> {
    let config = args.model.resolve(config_path)?;
    let model = open_model(config).await?;

    println!("{}", serde_json::to_string_pretty(model.metadata()?)?);

    model.close()?;
    Ok(())
}
