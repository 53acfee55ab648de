//! widget-etl-store - SQLite persistence for the widget ETL pipeline
//!
//! Writes named flat tables with replace semantics and keeps a small metadata
//! table (schema version, last successful run).

pub mod connection;
pub mod schema;
pub mod tables;

pub use connection::{default_db_path, DbStats, EtlDb, StoreError, TableStats};
pub use schema::DB_VERSION;

/// Table holding the transformed batch
pub const TRANSFORMED_TABLE: &str = "transformed_data";

/// Table holding the location → ids index
pub const INVERTED_INDEX_TABLE: &str = "inverted_index";
