//! Batch and flat table containers

use serde_json::{Map, Value};

use crate::types::{Row, Scalar};

/// Anything with a named, ordered column set and a row count
pub trait Columnar {
    fn columns(&self) -> &[String];

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn has_column(&self, name: &str) -> bool {
        self.columns().iter().any(|c| c == name)
    }

    /// Cell at (`row`, `column`) as JSON; composites stay composite
    fn cell(&self, row: usize, column: usize) -> Value;
}

/// The working set of rows at one pipeline stage
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Batch {
    columns: Vec<String>,
    rows: Vec<Row>,
}

impl Batch {
    pub fn new(columns: Vec<String>, rows: Vec<Row>) -> Self {
        Self { columns, rows }
    }

    /// Build a batch from JSON objects; the column set is the union of keys in
    /// order of first appearance
    pub fn from_objects(objects: &[Map<String, Value>]) -> Result<Self, (usize, String)> {
        let mut columns: Vec<String> = Vec::new();
        let mut rows = Vec::with_capacity(objects.len());

        for (index, object) in objects.iter().enumerate() {
            for key in object.keys() {
                if !columns.iter().any(|c| c == key) {
                    columns.push(key.clone());
                }
            }
            rows.push(Row::from_json(object).map_err(|e| (index, e))?);
        }

        Ok(Self { columns, rows })
    }

    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    pub fn into_rows(self) -> Vec<Row> {
        self.rows
    }

    /// Same columns, new rows
    pub fn with_rows(&self, rows: Vec<Row>) -> Self {
        Self {
            columns: self.columns.clone(),
            rows,
        }
    }

    /// Column set with `added` appended (existing names are not repeated)
    pub fn columns_with(&self, added: &[&str]) -> Vec<String> {
        let mut columns = self.columns.clone();
        for name in added {
            if !columns.iter().any(|c| c == name) {
                columns.push(name.to_string());
            }
        }
        columns
    }

    /// Row as a JSON object restricted to this batch's columns
    pub fn row_object(&self, index: usize) -> Map<String, Value> {
        let row = &self.rows[index];
        self.columns
            .iter()
            .map(|c| (c.clone(), row.value(c)))
            .collect()
    }
}

impl Columnar for Batch {
    fn columns(&self) -> &[String] {
        &self.columns
    }

    fn len(&self) -> usize {
        self.rows.len()
    }

    fn cell(&self, row: usize, column: usize) -> Value {
        self.rows[row].value(&self.columns[column])
    }
}

/// A table of scalar cells, safe for flat tabular storage
#[derive(Debug, Clone, PartialEq, Default)]
pub struct FlatTable {
    columns: Vec<String>,
    rows: Vec<Vec<Scalar>>,
}

impl FlatTable {
    /// Rows shorter than the column set are padded with nulls
    pub fn new(columns: Vec<String>, rows: Vec<Vec<Scalar>>) -> Self {
        let width = columns.len();
        let rows = rows
            .into_iter()
            .map(|mut row| {
                row.resize(width, Scalar::Null);
                row
            })
            .collect();
        Self { columns, rows }
    }

    pub fn rows(&self) -> &[Vec<Scalar>] {
        &self.rows
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    /// All values of one column, top to bottom
    pub fn column(&self, name: &str) -> Option<Vec<&Scalar>> {
        let index = self.column_index(name)?;
        Some(self.rows.iter().map(|row| &row[index]).collect())
    }
}

impl Columnar for FlatTable {
    fn columns(&self) -> &[String] {
        &self.columns
    }

    fn len(&self) -> usize {
        self.rows.len()
    }

    fn cell(&self, row: usize, column: usize) -> Value {
        self.rows[row][column].to_json()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_from_objects_collects_column_union() {
        let objects: Vec<Map<String, Value>> = vec![
            json!({"id": 1, "email": "a@a.com"}),
            json!({"id": 2, "location": "Paris, FR"}),
        ]
        .into_iter()
        .map(|v| v.as_object().cloned().unwrap())
        .collect();

        let batch = Batch::from_objects(&objects).unwrap();
        assert_eq!(batch.columns(), &["id", "email", "location"]);
        assert_eq!(batch.len(), 2);
        assert_eq!(batch.row_object(1).get("email"), Some(&Value::Null));
    }

    #[test]
    fn test_from_objects_reports_row_index() {
        let objects: Vec<Map<String, Value>> = vec![json!({"id": 1}), json!({"email": 5})]
            .into_iter()
            .map(|v| v.as_object().cloned().unwrap())
            .collect();

        let (index, reason) = Batch::from_objects(&objects).unwrap_err();
        assert_eq!(index, 1);
        assert!(reason.contains("email"));
    }

    #[test]
    fn test_flat_table_pads_short_rows() {
        let table = FlatTable::new(
            vec!["a".to_string(), "b".to_string()],
            vec![vec![Scalar::Int(1)]],
        );
        assert_eq!(table.rows()[0], vec![Scalar::Int(1), Scalar::Null]);
        assert_eq!(table.column("b"), Some(vec![&Scalar::Null]));
    }
}
