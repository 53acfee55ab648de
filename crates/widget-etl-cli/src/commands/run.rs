//! Run command - the full extract, transform and load sequence

use anyhow::{Context, Result};
use std::path::PathBuf;
use widget_etl_core::{
    build_inverted_index, snapshot, top_users_table, Batch, Columnar, Pipeline, QualitySuite, Stage,
};
use widget_etl_store::EtlDb;

use crate::cli::{Cli, OutputFormat};
use crate::config::PipelineConfig;
use crate::output::{colors, human, json};

/// Per-invocation switches layered over the config
#[derive(Debug, Default)]
pub struct RunOptions {
    pub data_path: PathBuf,
    pub skip_quality: bool,
    pub snapshots: bool,
    pub staging_dir: Option<PathBuf>,
    pub resume: Option<(PathBuf, Stage)>,
}

pub fn run(cli: &Cli, config: &PipelineConfig, options: RunOptions) -> Result<()> {
    let staging_dir = options
        .staging_dir
        .clone()
        .unwrap_or_else(|| config.staging_dir.clone());
    let snapshots = options.snapshots || config.snapshots;

    let (input, pipeline) = match &options.resume {
        Some((path, after)) => {
            let batch = snapshot::load_batch_after(path, *after)
                .with_context(|| format!("Failed to load snapshot {}", path.display()))?;
            tracing::info!(path = %path.display(), after = %after, rows = batch.len(), "resuming from snapshot");
            (batch, Pipeline::new().resume_after(*after))
        }
        None => {
            let batch = super::load_raw(&options.data_path)?;
            if config.quality_gate && !options.skip_quality {
                check_quality(&batch)?;
            }
            if snapshots {
                let path = snapshot::export_snapshot(&batch, &staging_dir, "raw")
                    .context("Failed to write raw snapshot")?;
                tracing::debug!(path = %path.display(), "snapshot written");
            }
            (batch, Pipeline::new())
        }
    };

    tracing::info!(rows = input.len(), "original data rows");

    let output = pipeline
        .run_with(&input, |stage, batch| {
            tracing::info!(stage = %stage, rows = batch.len(), "stage complete");
            if snapshots {
                let path = snapshot::export_snapshot(batch, &staging_dir, stage.name())?;
                tracing::debug!(path = %path.display(), "snapshot written");
            }
            Ok(())
        })
        .context("Pipeline failed")?;

    if let Some(deduplicated) = output.rows_after(Stage::Deduplicated) {
        tracing::info!(
            removed = output.input_rows - deduplicated,
            "duplicate rows removed"
        );
    }
    if let Some(flattened) = output.rows_after(Stage::Flattened) {
        tracing::info!(rows = flattened, "rows after flattening widget_list");
    }
    if let Some(top) = &output.top_users {
        for user in top {
            tracing::info!(
                age_group = %user.age_group,
                id = %user.id,
                email = user.email.as_deref().unwrap_or(""),
                "top user"
            );
        }
        if snapshots {
            snapshot::export_snapshot(&top_users_table(top), &staging_dir, "top_users")
                .context("Failed to write top users snapshot")?;
        }
    }

    let mut db = EtlDb::open_or_create(&config.db_path)
        .with_context(|| format!("Failed to open database {}", config.db_path.display()))?;

    let written = db
        .load(&config.transformed_table, &output.transformed)
        .with_context(|| format!("Failed to write table {}", config.transformed_table))?;
    tracing::info!(table = %config.transformed_table, rows = written, "table written");

    let index = build_inverted_index(&output.transformed).context("Failed to build inverted index")?;
    db.replace_table(&config.index_table, &index.to_table())
        .with_context(|| format!("Failed to write table {}", config.index_table))?;
    tracing::info!(table = %config.index_table, rows = index.len(), "table written");

    db.mark_run_complete().context("Failed to record run")?;

    match cli.format {
        OutputFormat::Human => {
            println!("{}", colors::header("Pipeline Run"));
            println!();
            println!(
                "  {:<14} {} rows",
                colors::label("input"),
                colors::value(&colors::format_count(output.input_rows as i64))
            );
            for (stage, rows) in &output.stage_rows {
                println!("{}", human::format_stage_rows(*stage, *rows));
            }
            if let Some(top) = &output.top_users {
                println!();
                println!("{}", colors::header("Top User per Age Group"));
                for user in top {
                    println!("  {}", human::format_top_user(user));
                }
            }
            println!();
            println!(
                "{}",
                colors::success(&format!(
                    "Wrote {} rows to {} and {} locations to {} in {}",
                    colors::format_count(written as i64),
                    config.transformed_table,
                    colors::format_count(index.len() as i64),
                    config.index_table,
                    db.path().display()
                ))
            );
        }
        OutputFormat::Json => {
            let value = json::format_run(&output, index.len(), &db.path().to_string_lossy());
            println!("{}", serde_json::to_string_pretty(&value)?);
        }
        OutputFormat::Minimal => {
            println!("{}", db.path().display());
        }
    }

    Ok(())
}

fn check_quality(batch: &Batch) -> Result<()> {
    let report = QualitySuite::default()
        .validate(batch)
        .context("Failed to evaluate data quality")?;

    for failure in report.failures() {
        tracing::warn!(
            expectation = %failure.expectation,
            unexpected = failure.unexpected_count,
            sample = ?failure.sample,
            "expectation failed"
        );
    }
    report.into_result().context("Data quality gate rejected the input")?;
    tracing::info!("data quality checks passed");
    Ok(())
}
