//! CLI command implementations

pub mod index;
pub mod run;
pub mod status;
pub mod top_users;
pub mod validate;

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use widget_etl_core::{Batch, Columnar};

/// Input path from the command line, falling back to the config
pub fn data_path(arg: Option<&PathBuf>, config_path: &Path) -> PathBuf {
    arg.cloned().unwrap_or_else(|| config_path.to_path_buf())
}

/// Read the raw JSONL feed
pub fn load_raw(path: &Path) -> Result<Batch> {
    let batch = widget_etl_core::read_file(path)
        .with_context(|| format!("Failed to load input data from {}", path.display()))?;
    tracing::info!(path = %path.display(), rows = batch.len(), "loaded input data");
    Ok(batch)
}
