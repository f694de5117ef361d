/// File handling utilities
///
/// Helpers for naming the report bundle after the dataset and for moving
/// files into it.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use log::{info, warn};

/// Base name of the dataset file, e.g. `sales.csv`
pub fn dataset_base_name(dataset_path: &Path) -> String {
    dataset_path
        .file_name()
        .map(|name| name.to_string_lossy().to_string())
        .unwrap_or_else(|| dataset_path.to_string_lossy().to_string())
}

/// Directory the report bundle goes to: the dataset's stem under `root`
///
/// # Arguments
///
/// * `dataset_path` - Path to the dataset
/// * `root` - Parent directory for the bundle, usually the working directory
///
/// # Returns
///
/// `root/<stem>`, e.g. `./sales` for `data/sales.csv`
pub fn bundle_dir_for(dataset_path: &Path, root: &Path) -> PathBuf {
    let stem = dataset_path
        .file_stem()
        .map(|stem| stem.to_string_lossy().to_string())
        .unwrap_or_else(|| "analysis".to_string());
    root.join(stem)
}

/// Whether two paths name the same directory
pub fn same_directory(a: &Path, b: &Path) -> bool {
    match (fs::canonicalize(a), fs::canonicalize(b)) {
        (Ok(a), Ok(b)) => a == b,
        _ => a == b,
    }
}

/// Move `source` into `dest_dir`, keeping its file name
///
/// An existing file with the same name is replaced. Falls back to copy and
/// delete when a rename is not possible (e.g. across file systems).
///
/// # Returns
///
/// The new location of the file
pub fn move_into_dir(source: &Path, dest_dir: &Path) -> Result<PathBuf> {
    if !source.exists() {
        anyhow::bail!("Source file not found: {}", source.display());
    }

    let file_name = source
        .file_name()
        .with_context(|| format!("{} has no file name", source.display()))?;
    let destination = dest_dir.join(file_name);

    if destination.exists() {
        warn!("Overwriting existing file: {}", destination.display());
        fs::remove_file(&destination)
            .with_context(|| format!("Failed to remove {}", destination.display()))?;
    }

    match fs::rename(source, &destination) {
        Ok(()) => {}
        Err(e) if e.kind() != io::ErrorKind::NotFound => {
            fs::copy(source, &destination).with_context(|| {
                format!(
                    "Failed to copy {} to {}",
                    source.display(),
                    destination.display()
                )
            })?;
            fs::remove_file(source)
                .with_context(|| format!("Failed to remove {}", source.display()))?;
        }
        Err(e) => {
            return Err(e).with_context(|| format!("Failed to move {}", source.display()));
        }
    }

    info!("Moved {} to {}", source.display(), destination.display());
    Ok(destination)
}
