//! Error types for the core crate

use std::path::PathBuf;
use thiserror::Error;

use crate::schema::ColumnKind;

/// Core pipeline errors
#[derive(Error, Debug)]
pub enum EtlError {
    #[error("{stage}: input batch is empty")]
    EmptyInput { stage: &'static str },

    #[error("{stage}: missing required column(s): {}", .missing.join(", "))]
    MissingColumn {
        stage: &'static str,
        missing: Vec<String>,
    },

    #[error("{stage}: column '{column}' expects {expected} values, row {row} has {found}")]
    ColumnKind {
        stage: &'static str,
        column: &'static str,
        expected: ColumnKind,
        row: usize,
        found: String,
    },

    #[error("Failed to read source {}: {reason}", .path.display())]
    SourceRead { path: PathBuf, reason: String },

    #[error("Snapshot error: {0}")]
    Snapshot(#[from] SnapshotError),

    #[error("Quality gate failed: {0}")]
    QualityGate(String),
}

/// Snapshot read/write errors
#[derive(Error, Debug)]
pub enum SnapshotError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Invalid cell in column '{column}' at row {row}: {source}")]
    InvalidCell {
        column: String,
        row: usize,
        #[source]
        source: serde_json::Error,
    },

    #[error("Invalid row {row}: {reason}")]
    InvalidRow { row: usize, reason: String },
}

pub type Result<T, E = EtlError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_column_lists_all() {
        let err = EtlError::MissingColumn {
            stage: "get_top_user_per_age_group",
            missing: vec!["user_score".to_string(), "email".to_string()],
        };
        assert_eq!(
            err.to_string(),
            "get_top_user_per_age_group: missing required column(s): user_score, email"
        );
    }
}
