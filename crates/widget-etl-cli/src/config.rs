//! Pipeline configuration
//!
//! Settings come from an optional JSON file; any field left out keeps its
//! default, and command-line flags override both.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use widget_etl_store::{INVERTED_INDEX_TABLE, TRANSFORMED_TABLE};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PipelineConfig {
    pub data_path: PathBuf,
    pub staging_dir: PathBuf,
    pub db_path: PathBuf,
    /// Write a CSV snapshot after every stage
    pub snapshots: bool,
    /// Refuse to transform a feed that fails the quality rules
    pub quality_gate: bool,
    pub transformed_table: String,
    pub index_table: String,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            data_path: PathBuf::from("data").join("raw").join("data.json"),
            staging_dir: PathBuf::from("data").join("staging"),
            db_path: widget_etl_store::default_db_path(),
            snapshots: false,
            quality_gate: true,
            transformed_table: TRANSFORMED_TABLE.to_string(),
            index_table: INVERTED_INDEX_TABLE.to_string(),
        }
    }
}

/// Load the config file, or the defaults when no file is given
pub fn load_config(path: Option<&Path>) -> Result<PipelineConfig> {
    let Some(path) = path else {
        return Ok(PipelineConfig::default());
    };

    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file {}", path.display()))?;
    let config: PipelineConfig = serde_json::from_str(&content)
        .with_context(|| format!("Invalid config file {}", path.display()))?;

    tracing::debug!(path = %path.display(), "loaded config");
    Ok(config)
}
