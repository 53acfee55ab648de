//! Metadata schema
//!
//! Data tables are created on demand by [`crate::tables::replace_table`]; the
//! only fixed table is the key/value metadata table.

use rusqlite::{Connection, OptionalExtension};

use crate::connection::StoreError;

/// Current database schema version
pub const DB_VERSION: i32 = 1;

pub const METADATA_TABLE: &str = "etl_metadata";
pub const VERSION_KEY: &str = "version";
pub const LAST_RUN_KEY: &str = "last_run";

/// Create the metadata table and stamp the schema version
pub fn init_schema(conn: &mut Connection) -> Result<(), StoreError> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS etl_metadata (
            key TEXT PRIMARY KEY,
            value TEXT
        )",
    )?;

    set_metadata(conn, VERSION_KEY, &DB_VERSION.to_string())?;

    Ok(())
}

pub fn set_metadata(conn: &Connection, key: &str, value: &str) -> Result<(), StoreError> {
    conn.execute(
        "INSERT OR REPLACE INTO etl_metadata (key, value) VALUES (?1, ?2)",
        rusqlite::params![key, value],
    )?;
    Ok(())
}

/// Metadata value, `None` if the key (or the table) is absent
pub fn get_metadata(conn: &Connection, key: &str) -> Result<Option<String>, StoreError> {
    let exists: bool = conn.query_row(
        "SELECT COUNT(*) > 0 FROM sqlite_master WHERE type = 'table' AND name = ?1",
        [METADATA_TABLE],
        |row| row.get(0),
    )?;
    if !exists {
        return Ok(None);
    }

    let value = conn
        .query_row(
            "SELECT value FROM etl_metadata WHERE key = ?1",
            [key],
            |row| row.get(0),
        )
        .optional()?;
    Ok(value)
}
