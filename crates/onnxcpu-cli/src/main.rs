//! Command-line host for the onnxcpu ML model service.

mod commands;

use clap::{Parser, Subcommand};
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

use commands::{config, infer, metadata, platform};

/// Run ONNX models on the CPU
#[derive(Parser)]
#[command(name = "onnxcpu")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Path to config file
    #[arg(short, long, global = true)]
    config: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the input and output tensors of a model
    Metadata(metadata::MetadataArgs),

    /// Run a model on an image
    Infer(infer::InferArgs),

    /// Manage configuration
    Config(config::ConfigArgs),

    /// Show the native runtime library for this platform
    Platform(platform::PlatformArgs),
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Set up logging based on verbosity
    let level = match cli.verbose {
        0 => Level::WARN,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .with_writer(std::io::stderr)
        .finish();

    tracing::subscriber::set_global_default(subscriber)?;

    match cli.command {
        Commands::Metadata(args) => metadata::run(args, cli.config.as_deref()).await,
        Commands::Infer(args) => infer::run(args, cli.config.as_deref()).await,
        Commands::Config(args) => config::run(args, cli.config.as_deref()).await,
        Commands::Platform(args) => platform::run(args).await,
    }
}
