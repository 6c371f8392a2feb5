//! Label files attached to model outputs.

use std::path::Path;

use tracing::debug;

use crate::error::{OnnxCpuError, Result};

/// Load a newline-delimited label file. Line `i` labels class `i`.
pub fn load_labels(path: &Path) -> Result<Vec<String>> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| OnnxCpuError::Labels(format!("{}: {}", path.display(), e)))?;

    let labels = parse_labels(&content);
    debug!("Loaded {} labels from {}", labels.len(), path.display());
    Ok(labels)
}

fn parse_labels(content: &str) -> Vec<String> {
    content.lines().map(|line| line.trim().to_string()).collect()
}
