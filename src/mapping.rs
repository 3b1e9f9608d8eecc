//! Projection of source columns onto output fields.

use crate::config::Configuration;
use crate::error::{EtlError, EtlResult};
use crate::types::{Batch, Row, Value};

enum Projection<'a> {
    Copy(usize),
    Merge {
        columns: Vec<usize>,
        delimiters: &'a [String],
    },
}

impl Projection<'_> {
    fn project(&self, values: &[Value]) -> Value {
        match self {
            Self::Copy(idx) => values.get(*idx).cloned().unwrap_or(Value::Null),
            Self::Merge { columns, delimiters } => {
                let mut merged = String::new();
                for (i, idx) in columns.iter().enumerate() {
                    if i > 0 {
                        merged.push_str(delimiters.get(i - 1).map_or("", String::as_str));
                    }
                    if let Some(v) = values.get(*idx) {
                        merged.push_str(&v.to_text());
                    }
                }
                Value::Utf8(merged)
            }
        }
    }
}

/// Build the output-shaped batch: one column per output field, in configuration order.
///
/// Single-source fields copy the source cell unchanged; multi-source fields concatenate the
/// textual form of each source cell (nulls as empty strings) with the configured delimiters.
/// Row positions are carried over untouched.
pub fn map_fields(source: Batch, configuration: &Configuration) -> EtlResult<Batch> {
    let projections = configuration
        .output_fields
        .iter()
        .map(|field| {
            let columns = field
                .source_fields
                .iter()
                .map(|&idx| {
                    let name = configuration
                        .source_fields
                        .get(idx)
                        .map(|f| f.name.as_str())
                        .ok_or_else(|| {
                            EtlError::config(format!(
                                "Output field '{}' refers to unknown source field {idx}",
                                field.name
                            ))
                        })?;
                    source.column_index(name).ok_or_else(|| {
                        EtlError::schema(format!(
                            "Expected field '{name}' was not found in the source data. If this field is no longer \
                             required, please update the file template."
                        ))
                    })
                })
                .collect::<EtlResult<Vec<usize>>>()?;

            Ok(match columns.as_slice() {
                [single] => Projection::Copy(*single),
                _ => Projection::Merge {
                    columns,
                    delimiters: &field.merge_delimiters,
                },
            })
        })
        .collect::<EtlResult<Vec<Projection<'_>>>>()?;

    let columns = configuration
        .output_fields
        .iter()
        .map(|f| f.name.clone())
        .collect();
    let rows = source
        .rows
        .into_iter()
        .map(|row| {
            let values = projections.iter().map(|p| p.project(&row.values)).collect();
            Row::new(row.position, values)
        })
        .collect();
    Ok(Batch::new(columns, rows))
}

#[cfg(test)]
mod tests {
    use super::map_fields;
    use crate::config::{Configuration, FileType, OutputField, OutputFile, SourceField, SourceFile};
    use crate::error::EtlError;
    use crate::types::{Batch, DataType, Row, Value};

    const ID: &str = "fc01da57-106a-4255-be48-3e634296ce3f";

    fn config() -> Configuration {
        Configuration::new(
            ID,
            vec![SourceFile::new(FileType::Csv)],
            vec![
                SourceField::new("year", 0),
                SourceField::new("month", 0),
                SourceField::new("day", 0),
            ],
            OutputFile::new(FileType::Csv),
            vec![
                OutputField::new("Date", DataType::Date, vec![0, 1, 2]).with_merge_delimiters(["-", "-"]),
                OutputField::new("Year", DataType::Int, vec![0]),
            ],
        )
        .unwrap()
    }

    #[test]
    fn merges_and_copies_columns() {
        let source = Batch::new(
            vec!["day".to_string(), "month".to_string(), "year".to_string()],
            vec![
                Row::new(7, vec![Value::from("05"), Value::from("03"), Value::Int(2024)]),
                Row::new(8, vec![Value::Null, Value::from("04"), Value::Int(2023)]),
            ],
        );
        let out = map_fields(source, &config()).unwrap();

        assert_eq!(out.columns, vec!["Date", "Year"]);
        assert_eq!(out.rows[0], Row::new(7, vec![Value::from("2024-03-05"), Value::Int(2024)]));
        assert_eq!(out.rows[1].values[0], Value::from("2023-04-"));
        assert_eq!(out.rows[1].position, 8);
    }

    #[test]
    fn missing_source_column_is_a_schema_mismatch() {
        let source = Batch::from_values(vec!["year".to_string()], vec![vec![Value::Int(2024)]]);
        let err = map_fields(source, &config()).unwrap_err();
        match err {
            EtlError::SchemaMismatch { message } => assert!(message.contains("'month'"), "{message}"),
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
