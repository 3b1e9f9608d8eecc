//! JSON record loading.
//!
//! Supported inputs:
//! - An array of objects: `[{"a":1}, {"a":2}]` (a single top-level object counts as one record)
//! - Newline-delimited JSON when `lineDelimitedJSON` is set: `{"a":1}\n{"a":2}\n`
//!
//! Nested fields are addressed with dot paths in source field names (e.g. `user.name`). A key that
//! is missing from a record reads as null.

use std::fs;
use std::path::Path;

use crate::config::{SourceField, SourceFile};
use crate::error::{EtlError, EtlResult};
use crate::types::{Batch, Row, Value};

/// Load every record of a JSON file.
pub fn read_json_path(path: impl AsRef<Path>, spec: &SourceFile, fields: &[&SourceField]) -> EtlResult<Batch> {
    let text = fs::read_to_string(path)?;
    read_json_str(&text, spec, fields)
}

/// Load every record of an in-memory JSON document.
pub fn read_json_str(input: &str, spec: &SourceFile, fields: &[&SourceField]) -> EtlResult<Batch> {
    let trimmed = input.trim();
    let records = if trimmed.is_empty() {
        Vec::new()
    } else if spec.line_delimited_json {
        let mut values = Vec::new();
        for (i, line) in trimmed.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            let v = serde_json::from_str::<serde_json::Value>(line).map_err(|e| {
                EtlError::schema(format!("invalid line-delimited JSON at line {}: {e}", i + 1))
            })?;
            values.push(v);
        }
        values
    } else {
        match serde_json::from_str::<serde_json::Value>(trimmed)? {
            serde_json::Value::Array(items) => items,
            obj @ serde_json::Value::Object(_) => vec![obj],
            _ => {
                return Err(EtlError::schema(
                    "JSON input must be an array of objects (or line-delimited objects)",
                ));
            }
        }
    };
    records_to_batch(&records, fields)
}

fn records_to_batch(records: &[serde_json::Value], fields: &[&SourceField]) -> EtlResult<Batch> {
    let used: Vec<&SourceField> = fields.iter().copied().filter(|f| f.used).collect();
    let columns = used.iter().map(|f| f.name.clone()).collect();

    let mut rows = Vec::with_capacity(records.len());
    for (idx0, record) in records.iter().enumerate() {
        let position = idx0 + 1;
        let obj = record.as_object().ok_or_else(|| {
            EtlError::schema(format!("Object {position} is not a JSON object"))
        })?;
        let values = used
            .iter()
            .map(|f| get_by_dot_path(obj, &f.name).map_or(Value::Null, Value::from_json))
            .collect();
        rows.push(Row::new(position, values));
    }
    Ok(Batch::new(columns, rows))
}

fn get_by_dot_path<'a>(
    root: &'a serde_json::Map<String, serde_json::Value>,
    path: &str,
) -> Option<&'a serde_json::Value> {
    // An exact key wins over a nested lookup.
    if let Some(v) = root.get(path) {
        return Some(v);
    }
    if !path.contains('.') {
        return None;
    }

    let mut segments = path.split('.');
    let mut current = root.get(segments.next()?)?;
    for segment in segments {
        match current {
            serde_json::Value::Object(map) => current = map.get(segment)?,
            _ => return None,
        }
    }
    Some(current)
}

#[cfg(test)]
mod tests {
    use super::read_json_str;
    use crate::config::{FileType, SourceField, SourceFile};
    use crate::error::EtlError;
    use crate::types::Value;

    fn fields() -> Vec<SourceField> {
        vec![SourceField::new("id", 0), SourceField::new("user.name", 0)]
    }

    #[test]
    fn reads_arrays_with_nested_paths() {
        let input = r#"[{"id": 1, "user": {"name": "ada"}}, {"id": 2.5, "user": {}}]"#;
        let owned = fields();
        let refs: Vec<&SourceField> = owned.iter().collect();
        let batch = read_json_str(input, &SourceFile::new(FileType::Json), &refs).unwrap();

        assert_eq!(batch.columns, vec!["id", "user.name"]);
        assert_eq!(batch.rows[0].values, vec![Value::Int(1), Value::from("ada")]);
        assert_eq!(batch.rows[1].values, vec![Value::Float(2.5), Value::Null]);
        assert_eq!(batch.rows[1].position, 2);
    }

    #[test]
    fn reads_line_delimited_records() {
        let input = "{\"id\": 1}\n\n{\"id\": 2, \"user.name\": \"flat\"}\n";
        let mut spec = SourceFile::new(FileType::Json);
        spec.line_delimited_json = true;
        let owned = fields();
        let refs: Vec<&SourceField> = owned.iter().collect();
        let batch = read_json_str(input, &spec, &refs).unwrap();

        assert_eq!(batch.row_count(), 2);
        assert_eq!(batch.rows[1].values[1], Value::from("flat"));
    }

    #[test]
    fn rejects_non_object_records() {
        let owned = fields();
        let refs: Vec<&SourceField> = owned.iter().collect();
        let err = read_json_str("[1, 2]", &SourceFile::new(FileType::Json), &refs).unwrap_err();
        assert!(matches!(err, EtlError::SchemaMismatch { .. }));
        let err = read_json_str("[{", &SourceFile::new(FileType::Json), &refs).unwrap_err();
        assert!(matches!(err, EtlError::Json(_)));
    }
}
