//! Platform command - show which native runtime library applies here.

use clap::Args;
use console::style;

use onnxcpu_core::{current_library, supported_platforms};

/// Arguments for the platform command.
#[derive(Args)]
pub struct PlatformArgs {
    /// List every supported platform
    #[arg(short, long)]
    all: bool,
}

pub async fn run(args: PlatformArgs) -> anyhow::Result<()> {
    if args.all {
        println!("{}", style("Supported platforms:").bold());
        for lib in supported_platforms() {
            println!(
                "  {:<8} {:<8} {}",
                lib.os,
                lib.arch,
                lib.default_path().display()
            );
        }
        println!();
    }

    let lib = current_library()?;
    println!(
        "{} {}/{} uses {}",
        style("✓").green(),
        lib.os,
        lib.arch,
        lib.default_path().display()
    );

    Ok(())
}
