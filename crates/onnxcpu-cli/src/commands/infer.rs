//! Infer command - run a model on a single image.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use clap::Args;
use console::style;
use serde::Serialize;
use tracing::{info, warn};

use onnxcpu_core::{
    load_labels, top_k, ClassScore, ImageTensorizer, MlModelService, NamedTensors, Normalization,
    OnnxCpuModel, Tensor,
};

use super::{open_model, ModelArgs};

/// Arguments for the infer command.
#[derive(Args)]
pub struct InferArgs {
    /// Input image
    #[arg(short, long)]
    image: PathBuf,

    #[command(flatten)]
    model: ModelArgs,

    /// Pixel normalization for float32 inputs
    #[arg(short, long, value_enum, default_value = "unit")]
    normalize: NormalizeArg,

    /// Print the k best classes of every output
    #[arg(short = 'k', long)]
    top_k: Option<usize>,

    /// Number of leading values to print per output
    #[arg(long, default_value_t = 8)]
    preview: usize,

    /// Output file (default: stdout)
    #[arg(short, long)]
    output: Option<PathBuf>,
}

#[derive(Clone, Copy, Debug, clap::ValueEnum)]
pub enum NormalizeArg {
    /// Raw 0-255 values
    None,
    /// Scale to 0-1
    Unit,
    /// ImageNet mean / std
    Imagenet,
}

impl From<NormalizeArg> for Normalization {
    fn from(arg: NormalizeArg) -> Self {
        match arg {
            NormalizeArg::None => Normalization::None,
            NormalizeArg::Unit => Normalization::Unit,
            NormalizeArg::Imagenet => Normalization::ImageNet,
        }
    }
}

/// What is printed for one output tensor.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct OutputSummary {
    name: String,
    data_type: String,
    shape: Vec<usize>,
    values: Vec<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    top: Option<Vec<ClassScore>>,
}

pub async fn run(args: InferArgs, config_path: Option<&str>) -> anyhow::Result<()> {
    let start = Instant::now();

    if !args.image.exists() {
        anyhow::bail!("Input file not found: {}", args.image.display());
    }

    let config = args.model.resolve(config_path)?;
    let model = Arc::new(open_model(config).await?);

    let summaries = infer_and_close(&model, &args).await?;

    info!("Inference finished in {}ms", start.elapsed().as_millis());

    let rendered = serde_json::to_string_pretty(&summaries)?;
    if let Some(output_path) = &args.output {
        fs::write(output_path, &rendered)?;
        println!(
            "{} Output written to {}",
            style("✓").green(),
            output_path.display()
        );
    } else {
        println!("{}", rendered);
    }

    Ok(())
}

/// Run the model on the image and close it, whether or not the run succeeded.
async fn infer_and_close(
    model: &Arc<OnnxCpuModel>,
    args: &InferArgs,
) -> anyhow::Result<Vec<OutputSummary>> {
    let outcome = infer_image(model, args).await;
    let closed = model.close();

    // The inference error wins over a close error.
    let summaries = outcome?;
    closed?;
    Ok(summaries)
}

async fn infer_image(
    model: &Arc<OnnxCpuModel>,
    args: &InferArgs,
) -> anyhow::Result<Vec<OutputSummary>> {
    let image = image::open(&args.image)?;
    let input = model
        .metadata()?
        .inputs
        .first()
        .cloned()
        .ok_or_else(|| anyhow::anyhow!("model has no inputs to feed an image to"))?;
    if model.metadata()?.inputs.len() > 1 {
        warn!("Model has several inputs, only {:?} is fed", input.name);
    }

    let tensor = ImageTensorizer::new()
        .with_normalization(args.normalize.into())
        .tensorize(&image, &input)?;

    let mut tensors = NamedTensors::new();
    tensors.insert(input.name.clone(), tensor);

    // Inference is CPU-bound; keep it off the async workers.
    let worker = Arc::clone(model);
    let outputs = tokio::task::spawn_blocking(move || worker.infer(&tensors)).await??;

    summarize(model, &outputs, args)
}

fn summarize(
    model: &OnnxCpuModel,
    outputs: &NamedTensors,
    args: &InferArgs,
) -> anyhow::Result<Vec<OutputSummary>> {
    let mut summaries = Vec::with_capacity(outputs.len());

    for info in &model.metadata()?.outputs {
        let Some(tensor) = outputs.get(&info.name) else {
            continue;
        };

        let top = args.top_k.map(|k| {
            let labels = info.labels().and_then(|path| match load_labels(Path::new(path)) {
                Ok(labels) => Some(labels),
                Err(e) => {
                    warn!("Ignoring labels for {}: {}", info.name, e);
                    None
                }
            });
            top_k(tensor, k, labels.as_deref())
        });

        summaries.push(OutputSummary {
            name: info.name.clone(),
            data_type: tensor.dtype().to_string(),
            shape: tensor.shape().to_vec(),
            values: preview(tensor, args.preview),
            top,
        });
    }

    Ok(summaries)
}

fn preview(tensor: &Tensor, count: usize) -> Vec<f64> {
    match tensor {
        Tensor::Float32(arr) => arr.iter().take(count).map(|&v| f64::from(v)).collect(),
        Tensor::Uint8(arr) => arr.iter().take(count).map(|&v| f64::from(v)).collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use onnxcpu_core::ModelConfig;
    use onnxcpu_inference::fixtures::{DType, Dim, GraphBuilder};

    fn args_for(image: PathBuf) -> InferArgs {
        InferArgs {
            image,
            model: ModelArgs {
                model: None,
                labels: None,
            },
            normalize: NormalizeArg::Unit,
            top_k: Some(1),
            preview: 2,
            output: None,
        }
    }

    fn open(dir: &Path, dims: &[Dim]) -> Arc<OnnxCpuModel> {
        let path = GraphBuilder::new()
            .input("pixels", DType::Float32, dims)
            .identity("pixels", "scores")
            .output("scores", DType::Float32, dims)
            .write_to(dir, "model.onnx")
            .unwrap();
        Arc::new(OnnxCpuModel::new(&ModelConfig::new(path)).unwrap())
    }

    fn write_image(dir: &Path) -> PathBuf {
        let path = dir.join("black.png");
        image::RgbImage::new(4, 4).save(&path).unwrap();
        path
    }

    #[tokio::test]
    async fn test_model_closed_after_success() {
        let dir = tempfile::tempdir().unwrap();
        let dims = [Dim::Fixed(1), Dim::Fixed(3), Dim::Fixed(4), Dim::Fixed(4)];
        let model = open(dir.path(), &dims);

        let summaries = infer_and_close(&model, &args_for(write_image(dir.path())))
            .await
            .unwrap();
        assert_eq!(summaries.len(), 1);
        assert_eq!(summaries[0].values, vec![0.0, 0.0]);
        assert!(model.is_closed());
    }

    #[tokio::test]
    async fn test_model_closed_after_failure() {
        let dir = tempfile::tempdir().unwrap();
        // A flat input cannot take an image.
        let model = open(dir.path(), &[Dim::Fixed(4)]);

        let result = infer_and_close(&model, &args_for(write_image(dir.path()))).await;
        assert!(result.is_err());
        assert!(model.is_closed());
    }
}
