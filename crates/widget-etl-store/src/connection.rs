//! Database connection management

use rusqlite::{Connection, OpenFlags};
use std::path::{Path, PathBuf};
use thiserror::Error;
use widget_etl_core::FlatTable;

use crate::schema;
use crate::tables;

/// Store errors
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Database not found at {0}")]
    NotFound(PathBuf),

    #[error("Store write error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Refusing to write empty table '{0}'")]
    EmptyTable(String),

    #[error("Invalid table name '{0}'")]
    InvalidTableName(String),

    #[error("Table '{0}' has no columns")]
    NoColumns(String),
}

/// Default database path, relative to the working directory
pub fn default_db_path() -> PathBuf {
    PathBuf::from("data").join("export").join("database.db")
}

/// Read-write connection to the export database
pub struct EtlDb {
    pub(crate) conn: Connection,
    path: PathBuf,
}

impl EtlDb {
    /// Open or create the database at the default path
    pub fn open_or_create_default() -> Result<Self, StoreError> {
        Self::open_or_create(&default_db_path())
    }

    /// Open or create the database at a specific path
    pub fn open_or_create(path: &Path) -> Result<Self, StoreError> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let conn = Connection::open_with_flags(
            path,
            OpenFlags::SQLITE_OPEN_READ_WRITE
                | OpenFlags::SQLITE_OPEN_CREATE
                | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )?;

        let mut db = Self {
            conn,
            path: path.to_path_buf(),
        };
        schema::init_schema(&mut db.conn)?;

        Ok(db)
    }

    /// Open an existing database read-only
    pub fn open_existing(path: &Path) -> Result<Self, StoreError> {
        if !path.exists() {
            return Err(StoreError::NotFound(path.to_path_buf()));
        }

        let conn = Connection::open_with_flags(
            path,
            OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )?;

        Ok(Self {
            conn,
            path: path.to_path_buf(),
        })
    }

    /// In-memory database with the schema applied
    pub fn open_in_memory() -> Result<Self, StoreError> {
        let mut conn = Connection::open_in_memory()?;
        schema::init_schema(&mut conn)?;
        Ok(Self {
            conn,
            path: PathBuf::from(":memory:"),
        })
    }

    /// Get the database path
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Get a reference to the underlying connection
    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    /// Drop any table called `name` and write `table` in its place
    pub fn replace_table(&mut self, name: &str, table: &FlatTable) -> Result<usize, StoreError> {
        let tx = self.conn.transaction()?;
        let written = tables::replace_table(&tx, name, table)?;
        tx.commit()?;
        Ok(written)
    }

    /// Like [`EtlDb::replace_table`], but an empty table is an error
    pub fn load(&mut self, name: &str, table: &FlatTable) -> Result<usize, StoreError> {
        if table.rows().is_empty() {
            return Err(StoreError::EmptyTable(name.to_string()));
        }
        self.replace_table(name, table)
    }

    /// Read a whole table back
    pub fn read_table(&self, name: &str) -> Result<FlatTable, StoreError> {
        tables::read_table(&self.conn, name)
    }

    /// Record the completion time of a pipeline run
    pub fn mark_run_complete(&self) -> Result<(), StoreError> {
        let now = chrono::Utc::now().to_rfc3339();
        schema::set_metadata(&self.conn, schema::LAST_RUN_KEY, &now)
    }

    /// Get database statistics
    pub fn stats(&self) -> Result<DbStats, StoreError> {
        let version = schema::get_metadata(&self.conn, schema::VERSION_KEY)?
            .and_then(|v| v.parse().ok())
            .unwrap_or(0);
        let last_run = schema::get_metadata(&self.conn, schema::LAST_RUN_KEY)?;

        let mut tables = Vec::new();
        for name in tables::list_tables(&self.conn)? {
            let count = tables::row_count(&self.conn, &name)?;
            tables.push(TableStats { name, rows: count });
        }

        let db_size = std::fs::metadata(&self.path)
            .map(|m| m.len())
            .unwrap_or(0);

        Ok(DbStats {
            version,
            tables,
            last_run,
            db_path: self.path.clone(),
            db_size_bytes: db_size,
        })
    }
}

/// Row count of one data table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableStats {
    pub name: String,
    pub rows: i64,
}

/// Database statistics
#[derive(Debug, Clone)]
pub struct DbStats {
    pub version: i32,
    pub tables: Vec<TableStats>,
    pub last_run: Option<String>,
    pub db_path: PathBuf,
    pub db_size_bytes: u64,
}

impl DbStats {
    pub fn rows_in(&self, table: &str) -> Option<i64> {
        self.tables.iter().find(|t| t.name == table).map(|t| t.rows)
    }

    /// Format database size as human-readable string
    pub fn format_size(&self) -> String {
        let bytes = self.db_size_bytes as f64;
        if bytes < 1024.0 {
            format!("{} B", bytes)
        } else if bytes < 1024.0 * 1024.0 {
            format!("{:.1} KB", bytes / 1024.0)
        } else if bytes < 1024.0 * 1024.0 * 1024.0 {
            format!("{:.1} MB", bytes / (1024.0 * 1024.0))
        } else {
            format!("{:.1} GB", bytes / (1024.0 * 1024.0 * 1024.0))
        }
    }
}
