use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};

use crate::constants::JSON_EXTENSION;
use crate::error::{Result, TelemetryError};
use crate::pipeline::processing::record::Record;

/// `*.json` files directly inside `dir`, sorted by file name.
pub fn list_json_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        let is_json = path
            .extension()
            .map_or(false, |ext| ext == JSON_EXTENSION);
        if is_json && path.is_file() {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

/// A document holds either one record object or an array of them.
pub fn records_from_value(value: Value) -> Result<Vec<Record>> {
    match value {
        Value::Array(items) => Ok(items.into_iter().map(Record::from_value).collect()),
        object @ Value::Object(_) => Ok(vec![Record::from_value(object)]),
        other => Err(TelemetryError::Document(format!(
            "expected a record object or an array of records, found {}",
            json_kind(&other)
        ))),
    }
}

pub fn load_records(path: &Path) -> Result<Vec<Record>> {
    let text = fs::read_to_string(path)?;
    let value: Value = serde_json::from_str(&text)?;
    records_from_value(value)
}

/// Write records as a pretty-printed JSON array (2-space indent).
pub fn write_records(path: &Path, records: Vec<Record>) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let values: Vec<Value> = records.into_iter().map(Record::into_value).collect();
    let mut text = serde_json::to_string_pretty(&values)?;
    text.push('\n');
    fs::write(path, text)?;
    Ok(())
}

pub fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default()
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
