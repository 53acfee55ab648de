//! Validate command - run the data-quality gate on its own

use anyhow::{bail, Result};
use std::path::Path;
use widget_etl_core::QualitySuite;

use crate::cli::{Cli, OutputFormat};
use crate::output::{colors, human};

pub fn run(cli: &Cli, data_path: &Path) -> Result<()> {
    let batch = super::load_raw(data_path)?;
    let report = QualitySuite::default().validate(&batch)?;

    match cli.format {
        OutputFormat::Human => {
            println!("{}", colors::header("Data Quality"));
            println!();
            for result in &report.results {
                println!("  {}", human::format_expectation(result));
            }
            println!();
            if report.success() {
                println!("{}", colors::success("All expectations met"));
            } else {
                println!(
                    "{}",
                    colors::error(&format!(
                        "{} of {} expectations failed",
                        report.failures().count(),
                        report.results.len()
                    ))
                );
            }
        }
        OutputFormat::Json => {
            let output = serde_json::json!({
                "success": report.success(),
                "results": report.results,
            });
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
        OutputFormat::Minimal => {
            for result in report.failures() {
                println!("{}", result.expectation);
            }
        }
    }

    if !report.success() {
        bail!("data quality check failed");
    }
    Ok(())
}
