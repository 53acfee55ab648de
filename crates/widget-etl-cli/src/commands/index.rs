//! Index command - build the location index without persisting it

use anyhow::{Context, Result};
use std::path::Path;
use widget_etl_core::{build_inverted_index, Pipeline};

use crate::cli::{Cli, OutputFormat};
use crate::output::{colors, human};

pub fn run(cli: &Cli, data_path: &Path) -> Result<()> {
    let raw = super::load_raw(data_path)?;
    let output = Pipeline::new().run(&raw).context("Pipeline failed")?;
    let index = build_inverted_index(&output.transformed).context("Failed to build index")?;

    match cli.format {
        OutputFormat::Human => {
            println!("{}", colors::header("Inverted Index"));
            println!();
            for entry in index.entries() {
                println!("  {}", human::format_index_entry(entry));
            }
            println!();
            println!(
                "{}",
                colors::label(&format!("{} locations", colors::format_count(index.len() as i64)))
            );
        }
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&index)?);
        }
        OutputFormat::Minimal => {
            for entry in index.entries() {
                println!("{}\t{}", entry.location, entry.ids);
            }
        }
    }

    Ok(())
}
