//! JSON output formatting

use serde_json::Value;
use widget_etl_core::PipelineOutput;
use widget_etl_store::DbStats;

/// Summary of a pipeline run
pub fn format_run(output: &PipelineOutput, index_entries: usize, db_path: &str) -> Value {
    let stages: serde_json::Map<String, Value> = output
        .stage_rows
        .iter()
        .map(|(stage, rows)| (stage.name().to_string(), Value::from(*rows)))
        .collect();

    serde_json::json!({
        "input_rows": output.input_rows,
        "stages": stages,
        "transformed_rows": output.transformed.rows().len(),
        "index_entries": index_entries,
        "top_users": output.top_users,
        "db_path": db_path,
        "status": "ok"
    })
}

/// Database statistics
pub fn format_stats(stats: &DbStats) -> Value {
    let tables: serde_json::Map<String, Value> = stats
        .tables
        .iter()
        .map(|t| (t.name.clone(), Value::from(t.rows)))
        .collect();

    serde_json::json!({
        "db_path": stats.db_path.to_string_lossy(),
        "db_size_bytes": stats.db_size_bytes,
        "version": stats.version,
        "tables": tables,
        "last_run": stats.last_run,
    })
}
