//! Top-users command - best-scoring user per age group

use anyhow::{Context, Result};
use std::path::Path;
use widget_etl_core::{deduplicate, get_top_user_per_age_group, rank_users};

use crate::cli::{Cli, OutputFormat};
use crate::output::{colors, human};

pub fn run(cli: &Cli, data_path: &Path) -> Result<()> {
    let raw = super::load_raw(data_path)?;
    let ranked = deduplicate(&raw)
        .and_then(|batch| rank_users(&batch))
        .context("Failed to rank users")?;
    let top = get_top_user_per_age_group(&ranked).context("Failed to pick top users")?;

    match cli.format {
        OutputFormat::Human => {
            println!("{}", colors::header("Top User per Age Group"));
            println!();
            for user in &top {
                println!("  {}", human::format_top_user(user));
            }
        }
        OutputFormat::Json => {
            for user in &top {
                println!("{}", serde_json::to_string(user)?);
            }
        }
        OutputFormat::Minimal => {
            for user in &top {
                println!("{}", user.id);
            }
        }
    }

    Ok(())
}
