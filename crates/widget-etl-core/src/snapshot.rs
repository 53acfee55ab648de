//! CSV snapshots of intermediate batches
//!
//! Each non-null cell is written as its JSON literal and null as an empty
//! field, so reloading a snapshot gives back the same columns, types and values.

use serde_json::{Map, Value};
use std::path::{Path, PathBuf};

use crate::batch::{Batch, Columnar, FlatTable};
use crate::error::SnapshotError;
use crate::pipeline::Stage;
use crate::types::{Row, Scalar};

/// Write `data` to `<folder>/<name>_<YYYYmmddHHMMSS>.csv` and return the path
pub fn export_snapshot<T: Columnar + ?Sized>(
    data: &T,
    folder: &Path,
    name: &str,
) -> Result<PathBuf, SnapshotError> {
    std::fs::create_dir_all(folder)?;
    let timestamp = chrono::Local::now().format("%Y%m%d%H%M%S");
    let path = folder.join(format!("{}_{}.csv", name, timestamp));
    write_snapshot(data, &path)?;
    Ok(path)
}

/// Write `data` to an explicit path
pub fn write_snapshot<T: Columnar + ?Sized>(data: &T, path: &Path) -> Result<(), SnapshotError> {
    let mut writer = csv::Writer::from_path(path)?;
    writer.write_record(data.columns())?;

    for row in 0..data.len() {
        let record: Vec<String> = (0..data.columns().len())
            .map(|column| encode_cell(&data.cell(row, column)))
            .collect();
        writer.write_record(&record)?;
    }

    writer.flush()?;
    Ok(())
}

/// Reload a snapshot of the raw batch
pub fn load_batch(path: &Path) -> Result<Batch, SnapshotError> {
    read_batch_with(path, Row::from_json)
}

/// Reload a snapshot written after `stage`
///
/// From flattening on, each `widget_list` cell holds one element, so a
/// list-valued cell is read back as a single element rather than re-expanded.
pub fn load_batch_after(path: &Path, stage: Stage) -> Result<Batch, SnapshotError> {
    if stage >= Stage::Flattened {
        read_batch_with(path, Row::from_flattened_json)
    } else {
        read_batch_with(path, Row::from_json)
    }
}

fn read_batch_with(
    path: &Path,
    parse: fn(&Map<String, Value>) -> Result<Row, String>,
) -> Result<Batch, SnapshotError> {
    let (columns, records) = read_records(path)?;

    let rows = records
        .iter()
        .enumerate()
        .map(|(index, object)| {
            parse(object).map_err(|reason| SnapshotError::InvalidRow {
                row: index + 1,
                reason,
            })
        })
        .collect::<Result<Vec<_>, _>>()?;

    Ok(Batch::new(columns, rows))
}

/// Reload a snapshot as a flat table; composite cells come back as JSON text
pub fn load_table(path: &Path) -> Result<FlatTable, SnapshotError> {
    let (columns, records) = read_records(path)?;

    let rows = records
        .into_iter()
        .map(|object| {
            columns
                .iter()
                .map(|c| {
                    let value = object.get(c).cloned().unwrap_or(Value::Null);
                    Scalar::from_json(&value).unwrap_or_else(|| Scalar::Text(value.to_string()))
                })
                .collect()
        })
        .collect();

    Ok(FlatTable::new(columns, rows))
}

/// Load a named snapshot file from a staging folder
pub fn load_from_staging(folder: &Path, file_name: &str) -> Result<Batch, SnapshotError> {
    load_batch(&folder.join(file_name))
}

fn read_records(path: &Path) -> Result<(Vec<String>, Vec<Map<String, Value>>), SnapshotError> {
    let mut reader = csv::Reader::from_path(path)?;
    let columns: Vec<String> = reader.headers()?.iter().map(String::from).collect();

    let mut records = Vec::new();
    for (index, result) in reader.records().enumerate() {
        let record = result?;
        let mut object = Map::new();
        for (column, field) in columns.iter().zip(record.iter()) {
            let value = decode_cell(field).map_err(|source| SnapshotError::InvalidCell {
                column: column.clone(),
                row: index + 1,
                source,
            })?;
            object.insert(column.clone(), value);
        }
        records.push(object);
    }

    Ok((columns, records))
}

fn encode_cell(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

fn decode_cell(field: &str) -> Result<Value, serde_json::Error> {
    if field.is_empty() {
        Ok(Value::Null)
    } else {
        serde_json::from_str(field)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transform::{
        convert_unsupported_types, extract_widget_info, flatten_widget_list, rank_users,
    };
    use crate::types::{WidgetElement, WidgetList};
    use serde_json::json;

    fn batch(values: Vec<Value>) -> Batch {
        let objects: Vec<Map<String, Value>> = values
            .into_iter()
            .map(|v| v.as_object().cloned().unwrap())
            .collect();
        Batch::from_objects(&objects).unwrap()
    }

    fn sample() -> Batch {
        batch(vec![
            json!({
                "id": 1,
                "created_at": "2023-02-01",
                "age_group": "18-24",
                "user_score": 7.5,
                "email": "a@example.com",
                "location": "Austin, TX",
                "widget_list": [{"name": "w1", "amount": 3}, {"name": "w2", "amount": 1.5}],
                "tags": {"vip": true}
            }),
            json!({
                "id": "2",
                "created_at": "2023-02-02",
                "age_group": "18-24",
                "user_score": 3,
                "email": "",
                "location": null,
                "widget_list": [{"name": "w3", "amount": 0}]
            }),
        ])
    }

    #[test]
    fn test_export_snapshot_creates_timestamped_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = export_snapshot(&sample(), dir.path(), "test_snapshot").unwrap();
        assert!(path.exists());

        let file_name = path.file_name().unwrap().to_string_lossy().to_string();
        assert!(file_name.starts_with("test_snapshot_"));
        assert!(file_name.ends_with(".csv"));
    }

    #[test]
    fn test_raw_batch_reloads_identically() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("raw.csv");
        let original = sample();

        write_snapshot(&original, &path).unwrap();
        let reloaded = load_from_staging(dir.path(), "raw.csv").unwrap();
        assert_eq!(reloaded, original);
    }

    #[test]
    fn test_mid_pipeline_batch_reloads_and_continues() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("flattened.csv");
        let flattened = flatten_widget_list(&rank_users(&sample()).unwrap()).unwrap();

        write_snapshot(&flattened, &path).unwrap();
        let reloaded = load_batch_after(&path, Stage::Flattened).unwrap();
        assert_eq!(reloaded, flattened);
        assert_eq!(
            extract_widget_info(&reloaded).unwrap(),
            extract_widget_info(&flattened).unwrap()
        );
    }

    #[test]
    fn test_flattened_list_element_stays_one_element() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("flattened.csv");
        let data = batch(vec![json!({
            "id": 1,
            "widget_list": [[1, 2], {"name": "a", "amount": 1}, null]
        })]);
        let flattened = flatten_widget_list(&data).unwrap();

        write_snapshot(&flattened, &path).unwrap();
        let reloaded = load_batch_after(&path, Stage::Flattened).unwrap();
        assert_eq!(reloaded, flattened);
        assert_eq!(
            reloaded.rows()[0].widget_list,
            WidgetList::Element(WidgetElement::Malformed(json!([1, 2])))
        );
        assert_eq!(
            reloaded.rows()[2].widget_list,
            WidgetList::Element(WidgetElement::Absent)
        );

        let resumed = load_batch_after(&path, Stage::WidgetInfo).unwrap();
        assert_eq!(flatten_widget_list(&resumed).unwrap(), flattened);
    }

    #[test]
    fn test_widget_extra_keys_survive_reload() {
        let dir = tempfile::tempdir().unwrap();
        let raw_path = dir.path().join("raw.csv");
        let data = batch(vec![json!({
            "id": 1,
            "widget_list": [{"amount": 3, "name": "gear", "color": "red", "sku": "G-1"}]
        })]);

        write_snapshot(&data, &raw_path).unwrap();
        let reloaded = load_batch(&raw_path).unwrap();
        assert_eq!(reloaded, data);
        assert_eq!(
            reloaded.rows()[0].value("widget_list"),
            json!([{"amount": 3, "name": "gear", "color": "red", "sku": "G-1"}])
        );

        let extracted = extract_widget_info(&flatten_widget_list(&reloaded).unwrap()).unwrap();
        let table_path = dir.path().join("transformed.csv");
        let table = convert_unsupported_types(&extracted).unwrap();
        write_snapshot(&table, &table_path).unwrap();
        assert_eq!(load_table(&table_path).unwrap(), table);
    }

    #[test]
    fn test_flat_table_reloads_identically() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("transformed.csv");
        let table = convert_unsupported_types(&sample()).unwrap();

        write_snapshot(&table, &path).unwrap();
        assert_eq!(load_table(&path).unwrap(), table);
    }

    #[test]
    fn test_header_only_snapshot_keeps_columns() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("empty.csv");
        let empty = Batch::new(vec!["id".to_string(), "location".to_string()], vec![]);

        write_snapshot(&empty, &path).unwrap();
        let reloaded = load_batch(&path).unwrap();
        assert_eq!(reloaded.columns(), &["id", "location"]);
        assert!(reloaded.is_empty());
    }

    #[test]
    fn test_invalid_cell() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.csv");
        std::fs::write(&path, "id,email\n1,not json\n").unwrap();

        let err = load_batch(&path).unwrap_err();
        assert!(matches!(err, SnapshotError::InvalidCell { ref column, row: 1, .. } if column == "email"));
    }
}
