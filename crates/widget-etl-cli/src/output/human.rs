//! Human-readable output formatting

use super::colors::*;
use widget_etl_core::{ExpectationResult, IndexEntry, Scalar, Stage, TopUser};
use widget_etl_store::TableStats;

fn or_dash(value: &Scalar) -> String {
    if value.is_null() {
        "-".to_string()
    } else {
        value.to_string()
    }
}

/// Format one top user as `age_group  id  email`
pub fn format_top_user(user: &TopUser) -> String {
    format!(
        "{:<8} {} {}",
        stage(&or_dash(&user.age_group)),
        value(&format!("{:>8}", or_dash(&user.id))),
        label(user.email.as_deref().unwrap_or("-"))
    )
}

/// Format one inverted index entry
pub fn format_index_entry(entry: &IndexEntry) -> String {
    let count = entry.ids.split(',').count();
    format!(
        "{} {}  {}",
        location(&entry.location),
        label(&format!("({})", count)),
        value(&entry.ids)
    )
}

/// Format the outcome of one quality expectation
pub fn format_expectation(result: &ExpectationResult) -> String {
    let text = result.expectation.to_string();
    if result.success {
        return success(&text);
    }

    let mut line = error(&text);
    if result.unexpected_count > 0 {
        line.push_str(&format!(
            "  {}",
            label(&format!("{} unexpected", format_count(result.unexpected_count as i64)))
        ));
    }
    if !result.sample.is_empty() {
        line.push_str(&format!("  {}", label(&format!("e.g. {}", result.sample.join(", ")))));
    }
    line
}

/// Format the row count after a stage
pub fn format_stage_rows(stage_name: Stage, rows: usize) -> String {
    format!(
        "  {:<14} {} rows",
        stage(stage_name.name()),
        value(&format_count(rows as i64))
    )
}

/// Format row counts of one table
pub fn format_table_stats(table: &TableStats) -> String {
    format!(
        "  {}: {}",
        label(&table.name),
        value(&format_count(table.rows))
    )
}
