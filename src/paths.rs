use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::debug;

use crate::error::{ClipBatchError, Result};

/// Directories a single request reads from and writes to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedPaths {
    pub working_dir: PathBuf,
    pub output_dir: PathBuf,
}

/// Derive the working and output directories for an operation and make sure the
/// output directory exists.
///
/// Without an override the output lands in `<working_dir>/<label>_output`.
/// Creation goes through `create_dir_all`, so an existing directory (including one
/// created concurrently by another request) is not an error.
pub async fn resolve(
    source_dir: Option<&Path>,
    output_override: Option<&Path>,
    operation_label: &str,
) -> Result<ResolvedPaths> {
    let source_dir = source_dir
        .filter(|dir| !dir.as_os_str().is_empty())
        .ok_or_else(|| ClipBatchError::invalid_request("Folder path is required"))?;

    let working_dir = absolutize(source_dir)?;
    let output_dir = match output_override.filter(|dir| !dir.as_os_str().is_empty()) {
        Some(dir) => absolutize(dir)?,
        None => working_dir.join(format!("{}_output", operation_label)),
    };

    fs::create_dir_all(&output_dir).await.map_err(|e| {
        ClipBatchError::file_system(
            format!("Failed to create output directory {}", output_dir.display()),
            e,
        )
    })?;

    debug!(
        "Resolved paths for {}: working={}, output={}",
        operation_label,
        working_dir.display(),
        output_dir.display()
    );

    Ok(ResolvedPaths {
        working_dir,
        output_dir,
    })
}

fn absolutize(path: &Path) -> Result<PathBuf> {
    std::path::absolute(path).map_err(|e| {
        ClipBatchError::file_system(format!("Failed to resolve path {}", path.display()), e)
    })
}
