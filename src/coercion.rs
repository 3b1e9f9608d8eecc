//! Null handling and type coercion for mapped batches.
//!
//! Runs right after field mapping, in three passes:
//! 1. blank strings (empty or whitespace-only) become nulls;
//! 2. nulls are replaced in nullable fields, or their rows are dropped (with one warning per
//!    field) in non-nullable fields;
//! 3. every cell is cast to its field's declared type; cells that cannot be cast drop their row
//!    and the field's first failure is reported as an error.

use crate::config::Configuration;
use crate::pipeline::Diagnostics;
use crate::temporal::parse_temporal;
use crate::types::{Batch, DataType, Value};

/// String literals coerced to `true` when no `truthyStrings` are configured.
pub const DEFAULT_TRUTHY_STRINGS: &[&str] = &["True", "1", "true", "Yes", "yes"];

/// The literal that could not be cast.
#[derive(Debug, Clone, PartialEq)]
pub struct CastFailure {
    pub literal: String,
}

/// Cast a single cell to `target`. Nulls stay null.
///
/// Strings become booleans only by membership in `truthy`; numbers are truthy when non-zero.
pub fn cast<S: AsRef<str>>(value: Value, target: DataType, truthy: &[S]) -> Result<Value, CastFailure> {
    if value.is_null() || target.matches(&value) {
        return Ok(value);
    }
    let fail = |v: &Value| CastFailure { literal: v.to_text() };

    let converted = match (target, &value) {
        (DataType::String, v) => Some(Value::Utf8(v.to_text())),

        (DataType::Int, Value::Float(f)) if f.is_finite() && f.trunc().abs() < 9.2e18 => {
            Some(Value::Int(f.trunc() as i64))
        }
        (DataType::Int, Value::Bool(b)) => Some(Value::Int(i64::from(*b))),
        (DataType::Int, Value::Utf8(s)) => s.trim().parse::<i64>().ok().map(Value::Int),

        (DataType::Float, Value::Int(i)) => Some(Value::Float(*i as f64)),
        (DataType::Float, Value::Bool(b)) => Some(Value::Float(if *b { 1.0 } else { 0.0 })),
        (DataType::Float, Value::Utf8(s)) => s.trim().parse::<f64>().ok().map(Value::Float),

        (DataType::Boolean, Value::Utf8(s)) => {
            Some(Value::Bool(truthy.iter().any(|t| t.as_ref() == s.as_str())))
        }
        (DataType::Boolean, Value::Int(i)) => Some(Value::Bool(*i != 0)),
        (DataType::Boolean, Value::Float(f)) => Some(Value::Bool(*f != 0.0)),

        (DataType::Date, Value::DateTime(dt)) => Some(Value::Date(dt.date())),
        (DataType::Date, Value::Utf8(s)) => parse_temporal(s).map(|t| Value::Date(t.to_date())),

        (DataType::DateTime, Value::Date(d)) => d.and_hms_opt(0, 0, 0).map(Value::DateTime),
        (DataType::DateTime, Value::Utf8(s)) => parse_temporal(s).map(|t| Value::DateTime(t.to_datetime())),

        _ => None,
    };
    converted.ok_or_else(|| fail(&value))
}

/// Apply blank-to-null normalization, the nullability policy and type coercion to a mapped batch.
pub fn prepare(mut batch: Batch, configuration: &Configuration, diagnostics: &mut Diagnostics) -> Batch {
    for row in &mut batch.rows {
        for value in &mut row.values {
            if matches!(value, Value::Utf8(s) if s.trim().is_empty()) {
                *value = Value::Null;
            }
        }
    }

    for field in &configuration.output_fields {
        let Some(col) = batch.column_index(&field.name) else {
            continue;
        };
        if field.allow_null {
            let replacement = field.null_replacement();
            if replacement.is_null() {
                continue;
            }
            for row in &mut batch.rows {
                if let Some(cell) = row.values.get_mut(col).filter(|cell| cell.is_null()) {
                    *cell = replacement.clone();
                }
            }
            continue;
        }

        let missing: Vec<String> = batch
            .rows
            .iter()
            .filter(|row| is_missing(&row.values, col))
            .map(|row| row.position.to_string())
            .collect();
        if missing.is_empty() {
            continue;
        }
        batch.retain_rows(|row| !is_missing(&row.values, col));
        diagnostics.warning(format!(
            "Missing values found in field '{}' for {}(s): {}. These rows will be skipped in the output. \
             If missing values should be allowed (or replaced) for this field, please alter your file template.",
            field.name,
            configuration.location_label(field),
            missing.join(", ")
        ));
    }

    for field in &configuration.output_fields {
        let Some(col) = batch.column_index(&field.name) else {
            continue;
        };

        let mut first_failure: Option<(String, usize)> = None;
        let mut failed = vec![false; batch.rows.len()];
        for (row, flag) in batch.rows.iter_mut().zip(failed.iter_mut()) {
            let Some(cell) = row.values.get_mut(col) else {
                continue;
            };
            if field.data_type.matches(cell) {
                continue;
            }
            let value = std::mem::replace(cell, Value::Null);
            match cast(value, field.data_type, &field.truthy_strings) {
                Ok(converted) => *cell = converted,
                Err(failure) => {
                    *cell = Value::Utf8(failure.literal.clone());
                    *flag = true;
                    first_failure.get_or_insert((failure.literal, row.position));
                }
            }
        }

        let Some((literal, position)) = first_failure else {
            continue;
        };
        let target = match field.data_type {
            DataType::Date | DataType::DateTime => "date or datetime",
            other => other.description(),
        };
        diagnostics.error(format!(
            "Could not coerce the value '{literal}' into a {target} for field '{}' ({} {position}).",
            field.name,
            configuration.location_label(field)
        ));
        let mut flags = failed.into_iter();
        batch.retain_rows(|_| !flags.next().unwrap_or(false));
    }

    batch
}

fn is_missing(values: &[Value], col: usize) -> bool {
    values.get(col).is_none_or(Value::is_null)
}
