//! Writing and reading flat data tables
//!
//! Tables are always replaced wholesale: the old table is dropped and a new one
//! is created with column types derived from the data.

use rusqlite::types::{Value as SqlValue, ValueRef};
use rusqlite::Connection;
use widget_etl_core::{Columnar, FlatTable, Scalar};

use crate::connection::StoreError;
use crate::schema::METADATA_TABLE;

/// Drop `name` if it exists and write `table` in its place
///
/// Returns the number of rows written. Callers wanting atomicity pass a
/// transaction.
pub fn replace_table(conn: &Connection, name: &str, table: &FlatTable) -> Result<usize, StoreError> {
    validate_table_name(name)?;
    if table.columns().is_empty() {
        return Err(StoreError::NoColumns(name.to_string()));
    }

    let column_defs: Vec<String> = table
        .columns()
        .iter()
        .enumerate()
        .map(|(i, column)| format!("{} {}", quote_ident(column), column_type(table, i)))
        .collect();

    conn.execute_batch(&format!(
        "DROP TABLE IF EXISTS {name};
         CREATE TABLE {name} ({columns});",
        name = quote_ident(name),
        columns = column_defs.join(", "),
    ))?;

    let placeholders: Vec<String> = (1..=table.columns().len())
        .map(|i| format!("?{}", i))
        .collect();
    let mut insert = conn.prepare(&format!(
        "INSERT INTO {} VALUES ({})",
        quote_ident(name),
        placeholders.join(", ")
    ))?;

    for row in table.rows() {
        let values: Vec<SqlValue> = row.iter().map(to_sql).collect();
        insert.execute(rusqlite::params_from_iter(values))?;
    }

    Ok(table.rows().len())
}

/// Read every row of `name`, in rowid order
pub fn read_table(conn: &Connection, name: &str) -> Result<FlatTable, StoreError> {
    validate_table_name(name)?;

    let mut stmt = conn.prepare(&format!("SELECT * FROM {} ORDER BY rowid", quote_ident(name)))?;
    let columns: Vec<String> = stmt.column_names().iter().map(|c| c.to_string()).collect();
    let width = columns.len();

    let rows = stmt
        .query_map([], |row| {
            (0..width)
                .map(|i| row.get_ref(i).map(from_sql))
                .collect::<Result<Vec<_>, _>>()
        })?
        .collect::<Result<Vec<_>, _>>()?;

    Ok(FlatTable::new(columns, rows))
}

/// Data tables in the database (the metadata table excluded)
pub fn list_tables(conn: &Connection) -> Result<Vec<String>, StoreError> {
    let mut stmt = conn.prepare(
        "SELECT name FROM sqlite_master
         WHERE type = 'table' AND name NOT LIKE 'sqlite_%' AND name != ?1
         ORDER BY name",
    )?;
    let names = stmt
        .query_map([METADATA_TABLE], |row| row.get(0))?
        .collect::<Result<Vec<String>, _>>()?;
    Ok(names)
}

pub fn row_count(conn: &Connection, name: &str) -> Result<i64, StoreError> {
    validate_table_name(name)?;
    let count = conn.query_row(
        &format!("SELECT COUNT(*) FROM {}", quote_ident(name)),
        [],
        |row| row.get(0),
    )?;
    Ok(count)
}

/// SQL type for a column: INTEGER if every value is integral, REAL if every
/// value is numeric, TEXT otherwise (including all-null columns)
fn column_type(table: &FlatTable, index: usize) -> &'static str {
    let mut saw_value = false;
    let mut all_integer = true;
    let mut all_numeric = true;

    for row in table.rows() {
        match &row[index] {
            Scalar::Null => continue,
            Scalar::Bool(_) | Scalar::Int(_) => {}
            Scalar::Float(_) => all_integer = false,
            Scalar::Text(_) => {
                all_integer = false;
                all_numeric = false;
            }
        }
        saw_value = true;
    }

    match (saw_value, all_integer, all_numeric) {
        (false, _, _) => "TEXT",
        (true, true, _) => "INTEGER",
        (true, false, true) => "REAL",
        _ => "TEXT",
    }
}

fn to_sql(value: &Scalar) -> SqlValue {
    match value {
        Scalar::Null => SqlValue::Null,
        Scalar::Bool(b) => SqlValue::Integer(i64::from(*b)),
        Scalar::Int(i) => SqlValue::Integer(*i),
        Scalar::Float(f) => SqlValue::Real(*f),
        Scalar::Text(s) => SqlValue::Text(s.clone()),
    }
}

fn from_sql(value: ValueRef<'_>) -> Scalar {
    match value {
        ValueRef::Null => Scalar::Null,
        ValueRef::Integer(i) => Scalar::Int(i),
        ValueRef::Real(f) => Scalar::Float(f),
        ValueRef::Text(t) | ValueRef::Blob(t) => Scalar::Text(String::from_utf8_lossy(t).into_owned()),
    }
}

fn validate_table_name(name: &str) -> Result<(), StoreError> {
    let valid = !name.is_empty()
        && name != METADATA_TABLE
        && !name.starts_with("sqlite_")
        && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_');
    if valid {
        Ok(())
    } else {
        Err(StoreError::InvalidTableName(name.to_string()))
    }
}

fn quote_ident(ident: &str) -> String {
    format!("\"{}\"", ident.replace('"', "\"\""))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema;

    fn conn() -> Connection {
        let mut conn = Connection::open_in_memory().unwrap();
        schema::init_schema(&mut conn).unwrap();
        conn
    }

    fn sample() -> FlatTable {
        FlatTable::new(
            vec![
                "id".to_string(),
                "user_score".to_string(),
                "email".to_string(),
                "empty".to_string(),
                "widget list".to_string(),
            ],
            vec![
                vec![
                    Scalar::Int(1),
                    Scalar::Float(4.5),
                    Scalar::from("a@a.com"),
                    Scalar::Null,
                    Scalar::from("[]"),
                ],
                vec![
                    Scalar::Int(2),
                    Scalar::Float(7.25),
                    Scalar::Null,
                    Scalar::Null,
                    Scalar::from("{}"),
                ],
            ],
        )
    }

    fn declared_types(conn: &Connection, table: &str) -> Vec<(String, String)> {
        let mut stmt = conn
            .prepare(&format!("PRAGMA table_info({})", quote_ident(table)))
            .unwrap();
        stmt.query_map([], |row| Ok((row.get(1)?, row.get(2)?)))
            .unwrap()
            .collect::<Result<Vec<_>, _>>()
            .unwrap()
    }

    #[test]
    fn test_replace_table_round_trip() {
        let conn = conn();
        let written = replace_table(&conn, "transformed_data", &sample()).unwrap();
        assert_eq!(written, 2);

        let read = read_table(&conn, "transformed_data").unwrap();
        assert_eq!(read, sample());
    }

    #[test]
    fn test_column_types_follow_values() {
        let conn = conn();
        replace_table(&conn, "transformed_data", &sample()).unwrap();

        let types = declared_types(&conn, "transformed_data");
        let types: Vec<(&str, &str)> = types.iter().map(|(n, t)| (n.as_str(), t.as_str())).collect();
        assert_eq!(
            types,
            vec![
                ("id", "INTEGER"),
                ("user_score", "REAL"),
                ("email", "TEXT"),
                ("empty", "TEXT"),
                ("widget list", "TEXT"),
            ]
        );
    }

    #[test]
    fn test_replace_drops_previous_contents() {
        let conn = conn();
        replace_table(&conn, "inverted_index", &sample()).unwrap();

        let smaller = FlatTable::new(
            vec!["location".to_string(), "id".to_string()],
            vec![vec![Scalar::from("NY"), Scalar::from("1,3")]],
        );
        replace_table(&conn, "inverted_index", &smaller).unwrap();

        assert_eq!(row_count(&conn, "inverted_index").unwrap(), 1);
        assert_eq!(read_table(&conn, "inverted_index").unwrap(), smaller);
        assert_eq!(list_tables(&conn).unwrap(), vec!["inverted_index"]);
    }

    #[test]
    fn test_invalid_table_names() {
        let conn = conn();
        for name in ["", "etl_metadata", "sqlite_master", "x; DROP TABLE y"] {
            assert!(matches!(
                replace_table(&conn, name, &sample()),
                Err(StoreError::InvalidTableName(_))
            ));
        }
    }

    #[test]
    fn test_table_without_columns() {
        let conn = conn();
        let table = FlatTable::new(vec![], vec![]);
        assert!(matches!(
            replace_table(&conn, "nothing", &table),
            Err(StoreError::NoColumns(_))
        ));
    }
}
