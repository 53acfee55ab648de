//! JSONL ingestion for raw activity feeds

use serde_json::{Map, Value};
use std::io::{BufRead, BufReader, Read};
use std::path::Path;

use crate::batch::Batch;
use crate::error::{EtlError, Result};

/// Parse a single JSONL line into a JSON object
pub fn parse_line(raw: &str) -> std::result::Result<Map<String, Value>, String> {
    match serde_json::from_str::<Value>(raw) {
        Ok(Value::Object(obj)) => Ok(obj),
        Ok(other) => Err(format!("expected a JSON object, got {}", type_name(&other))),
        Err(e) => Err(e.to_string()),
    }
}

/// Read a JSONL stream into a batch; `origin` is used in error messages
pub fn read_batch<R: Read>(reader: R, origin: &Path) -> Result<Batch> {
    let reader = BufReader::new(reader);
    let mut objects = Vec::new();
    let mut line_numbers = Vec::new();

    for (index, line_result) in reader.lines().enumerate() {
        let line_number = index + 1;
        let raw = line_result.map_err(|e| source_error(origin, e.to_string()))?;
        if raw.trim().is_empty() {
            continue;
        }

        let object = parse_line(&raw)
            .map_err(|e| source_error(origin, format!("line {}: {}", line_number, e)))?;
        objects.push(object);
        line_numbers.push(line_number);
    }

    Batch::from_objects(&objects).map_err(|(index, reason)| {
        source_error(origin, format!("line {}: {}", line_numbers[index], reason))
    })
}

/// Parse a JSONL file into a batch
pub fn read_file<P: AsRef<Path>>(path: P) -> Result<Batch> {
    let path = path.as_ref();
    let file = std::fs::File::open(path).map_err(|e| source_error(path, e.to_string()))?;
    read_batch(file, path)
}

fn source_error(path: &Path, reason: String) -> EtlError {
    EtlError::SourceRead {
        path: path.to_path_buf(),
        reason,
    }
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
