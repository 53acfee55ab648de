//! widget-etl-core - Core types and transforms for the widget ETL pipeline
//!
//! This crate holds the pure parts of the pipeline: the typed batch model,
//! JSONL ingestion, the transform stages, inverted-index construction, the
//! data-quality gate and CSV snapshots. Nothing here logs or touches the
//! database; see `widget-etl-store` for persistence.

pub mod batch;
pub mod error;
pub mod index;
pub mod parser;
pub mod pipeline;
pub mod quality;
pub mod schema;
pub mod snapshot;
pub mod transform;
pub mod types;

pub use batch::{Batch, Columnar, FlatTable};
pub use error::{EtlError, Result, SnapshotError};
pub use index::{build_inverted_index, IndexEntry, InvertedIndex};
pub use parser::{read_batch, read_file};
pub use pipeline::{Pipeline, PipelineOutput, Stage};
pub use quality::{Expectation, ExpectationResult, QualityReport, QualitySuite};
pub use schema::{columns, ColumnKind, ColumnSpec, Schema};
pub use transform::*;
pub use types::*;
