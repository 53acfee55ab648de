//! Status command - what the last run left in the database

use anyhow::Result;
use std::path::Path;
use widget_etl_store::{EtlDb, DB_VERSION};

use crate::cli::{Cli, OutputFormat};
use crate::output::{colors, human, json};

pub fn run(cli: &Cli, db_path: &Path) -> Result<()> {
    let db = match EtlDb::open_existing(db_path) {
        Ok(db) => db,
        Err(err) => {
            tracing::debug!(error = %err, "database unavailable");
            return not_found(cli, db_path);
        }
    };
    let stats = db.stats()?;

    match cli.format {
        OutputFormat::Human => {
            println!("{}", colors::header("Database Status"));
            println!();
            println!(
                "  {}: {}",
                colors::label("Database"),
                stats.db_path.display()
            );
            println!("  {}: {}", colors::label("Size"), stats.format_size());
            println!(
                "  {}: {}",
                colors::label("Version"),
                colors::value(&stats.version.to_string())
            );
            println!();
            if stats.tables.is_empty() {
                println!("  {}", colors::label("No tables written yet"));
            }
            for table in &stats.tables {
                println!("{}", human::format_table_stats(table));
            }

            println!();
            match &stats.last_run {
                Some(last) => println!(
                    "  {}: {}",
                    colors::label("Last run"),
                    colors::value(last)
                ),
                None => println!("{}", colors::warning("No completed run recorded")),
            }
            if stats.version < DB_VERSION {
                println!(
                    "{}",
                    colors::warning(&format!(
                        "Schema v{} is older than v{}",
                        stats.version, DB_VERSION
                    ))
                );
            }
        }
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&json::format_stats(&stats))?);
        }
        OutputFormat::Minimal => {
            for table in &stats.tables {
                println!("{}\t{}", table.name, table.rows);
            }
        }
    }

    Ok(())
}

fn not_found(cli: &Cli, db_path: &Path) -> Result<()> {
    match cli.format {
        OutputFormat::Human => {
            println!(
                "{}",
                colors::error(&format!("Database not found at {}", db_path.display()))
            );
            println!();
            println!("Run the pipeline to create it:");
            println!("  widget-etl run");
        }
        OutputFormat::Json => {
            let output = serde_json::json!({
                "status": "not_found",
                "db_path": db_path.to_string_lossy(),
            });
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
        OutputFormat::Minimal => {
            eprintln!("not found");
        }
    }
    Ok(())
}
