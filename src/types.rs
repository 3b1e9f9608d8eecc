//! Core data model: typed cells, rows and batches.
//!
//! Sources produce [`Batch`]es of loosely typed [`Value`]s (mostly [`Value::Utf8`] for text
//! formats); the pipeline maps, coerces and transforms them into the declared [`DataType`] of
//! each output field.

use std::fmt;

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::temporal::{DATETIME_OUTPUT_LAYOUT, DATE_OUTPUT_LAYOUT};

/// Declared type of a field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DataType {
    #[serde(rename = "STRING")]
    String,
    #[serde(rename = "INT")]
    Int,
    #[serde(rename = "FLOAT")]
    Float,
    #[serde(rename = "DATE")]
    Date,
    #[serde(rename = "DATETIME")]
    DateTime,
    #[serde(rename = "BOOLEAN")]
    Boolean,
}

impl DataType {
    /// User-facing name used in diagnostics ("Could not coerce ... into a number").
    pub fn description(self) -> &'static str {
        match self {
            Self::String => "string",
            Self::Int => "number",
            Self::Float => "decimal",
            Self::Date => "date",
            Self::DateTime => "datetime",
            Self::Boolean => "boolean",
        }
    }

    /// Whether `value` already has this runtime type. Nulls match every type.
    pub fn matches(self, value: &Value) -> bool {
        matches!(
            (self, value),
            (_, Value::Null)
                | (Self::String, Value::Utf8(_))
                | (Self::Int, Value::Int(_))
                | (Self::Float, Value::Float(_))
                | (Self::Date, Value::Date(_))
                | (Self::DateTime, Value::DateTime(_))
                | (Self::Boolean, Value::Bool(_))
        )
    }
}

/// A single cell.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// Missing value.
    Null,
    /// 64-bit signed integer.
    Int(i64),
    /// 64-bit float.
    Float(f64),
    Bool(bool),
    /// UTF-8 text. Text formats read every cell as this variant.
    Utf8(String),
    /// Calendar date without time.
    Date(NaiveDate),
    /// Date and time without a timezone.
    DateTime(NaiveDateTime),
}

impl Value {
    /// `true` only for [`Value::Null`].
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// `true` for nulls, empty strings and whitespace-only strings.
    pub fn is_blank(&self) -> bool {
        match self {
            Self::Null => true,
            Self::Utf8(s) => s.trim().is_empty(),
            _ => false,
        }
    }

    /// Runtime type name, used in operator fault messages.
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Int(_) => "integer",
            Self::Float(_) => "float",
            Self::Bool(_) => "boolean",
            Self::Utf8(_) => "string",
            Self::Date(_) => "date",
            Self::DateTime(_) => "datetime",
        }
    }

    /// Numeric view of integer and float cells.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Int(i) => Some(*i as f64),
            Self::Float(f) => Some(*f),
            _ => None,
        }
    }

    /// `true` for integer and float cells.
    pub fn is_numeric(&self) -> bool {
        matches!(self, Self::Int(_) | Self::Float(_))
    }

    /// Textual representation used for merging columns and for text-based output formats.
    /// Nulls render as the empty string.
    pub fn to_text(&self) -> String {
        match self {
            Self::Null => String::new(),
            Self::Int(i) => i.to_string(),
            Self::Float(f) => format_float(*f),
            Self::Bool(b) => b.to_string(),
            Self::Utf8(s) => s.clone(),
            Self::Date(d) => d.format(DATE_OUTPUT_LAYOUT).to_string(),
            Self::DateTime(dt) => dt.format(DATETIME_OUTPUT_LAYOUT).to_string(),
        }
    }

    /// Convert a JSON scalar into a cell. Arrays and objects are kept as their JSON text.
    pub fn from_json(v: &serde_json::Value) -> Self {
        match v {
            serde_json::Value::Null => Self::Null,
            serde_json::Value::Bool(b) => Self::Bool(*b),
            serde_json::Value::Number(n) => match n.as_i64() {
                Some(i) => Self::Int(i),
                None => n.as_f64().map(Self::Float).unwrap_or(Self::Null),
            },
            serde_json::Value::String(s) => Self::Utf8(s.clone()),
            other => Self::Utf8(other.to_string()),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_text())
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Self::Utf8(s.to_owned())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Self::Utf8(s)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Self::Int(i)
    }
}

impl From<f64> for Value {
    fn from(f: f64) -> Self {
        Self::Float(f)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Null => serializer.serialize_unit(),
            Self::Int(i) => serializer.serialize_i64(*i),
            Self::Float(f) => serializer.serialize_f64(*f),
            Self::Bool(b) => serializer.serialize_bool(*b),
            Self::Utf8(s) => serializer.serialize_str(s),
            Self::Date(_) | Self::DateTime(_) => serializer.serialize_str(&self.to_text()),
        }
    }
}

impl<'de> Deserialize<'de> for Value {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = serde_json::Value::deserialize(deserializer)?;
        Ok(Self::from_json(&raw))
    }
}

/// Render a float the way tabular tools usually do: integral values keep one decimal place.
pub fn format_float(f: f64) -> String {
    if f.is_finite() && f.fract() == 0.0 && f.abs() < 1e16 {
        format!("{f:.1}")
    } else {
        f.to_string()
    }
}

/// One row plus its 1-based position within the source file (or record list).
///
/// The position is assigned by the source and never changes, so diagnostics can point at the
/// original row no matter how the row was chunked or how many rows before it were dropped.
#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    /// 1-based position in the source.
    pub position: usize,
    /// One value per batch column.
    pub values: Vec<Value>,
}

impl Row {
    /// Create a row at `position` (1-based).
    pub fn new(position: usize, values: Vec<Value>) -> Self {
        Self { position, values }
    }
}

/// A bounded, ordered set of rows with named columns.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Batch {
    /// Column names, in order.
    pub columns: Vec<String>,
    /// Row-major storage; every row has `columns.len()` values.
    pub rows: Vec<Row>,
}

impl Batch {
    /// Create a batch from named columns and already positioned rows.
    pub fn new(columns: Vec<String>, rows: Vec<Row>) -> Self {
        Self { columns, rows }
    }

    /// Build a batch from plain value rows, numbering them 1, 2, 3, ...
    pub fn from_values(columns: Vec<String>, rows: Vec<Vec<Value>>) -> Self {
        let rows = rows
            .into_iter()
            .enumerate()
            .map(|(i, values)| Row::new(i + 1, values))
            .collect();
        Self { columns, rows }
    }

    /// An empty batch with the given columns.
    pub fn empty(columns: Vec<String>) -> Self {
        Self {
            columns,
            rows: Vec::new(),
        }
    }

    /// Number of rows.
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// Whether the batch has no rows.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Returns the index of a column by name, if present.
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    /// Iterate one column's cells in row order.
    pub fn column(&self, idx: usize) -> impl Iterator<Item = &Value> + '_ {
        self.rows.iter().filter_map(move |r| r.values.get(idx))
    }

    /// Keep only rows for which `predicate` returns `true`.
    pub fn retain_rows<F>(&mut self, predicate: F)
    where
        F: FnMut(&Row) -> bool,
    {
        self.rows.retain(predicate);
    }

    /// Move every row of `other` onto the end of this batch.
    ///
    /// # Panics
    ///
    /// Panics if the column sets differ.
    pub fn append(&mut self, mut other: Batch) {
        assert!(
            self.columns == other.columns,
            "cannot append batch with columns {:?} to batch with columns {:?}",
            other.columns,
            self.columns
        );
        self.rows.append(&mut other.rows);
    }

    /// Split off the first `n` rows into a new batch, leaving the remainder in `self`.
    pub fn take_front(&mut self, n: usize) -> Batch {
        let n = n.min(self.rows.len());
        let rest = self.rows.split_off(n);
        let head = std::mem::replace(&mut self.rows, rest);
        Batch::new(self.columns.clone(), head)
    }
}
