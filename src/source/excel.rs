//! Spreadsheet loading (`.xlsx`, `.xls`, `.ods`, ...).

use std::path::Path;

use calamine::{open_workbook_auto, Data, Reader};
use chrono::{Duration, NaiveDate, NaiveDateTime};

use super::FileLayout;
use crate::config::{SourceField, SourceFile};
use crate::error::{EtlError, EtlResult};
use crate::temporal::parse_temporal;
use crate::types::{Batch, Row, Value};

/// Load one sheet of a workbook.
///
/// Behavior:
/// - Picks `sheetName` if set; otherwise uses the first sheet in the workbook
/// - Skips `skipRows` rows (counted from the top of the sheet), then reads the header if present
/// - Keeps only the used source fields; cells keep their spreadsheet type
pub fn read_excel_path(path: impl AsRef<Path>, spec: &SourceFile, fields: &[&SourceField]) -> EtlResult<Batch> {
    let mut workbook = open_workbook_auto(path)?;
    let sheet = match spec.sheet_name.as_deref() {
        Some(name) => name.to_string(),
        None => workbook
            .sheet_names()
            .first()
            .cloned()
            .ok_or_else(|| EtlError::schema("workbook has no sheets"))?,
    };
    let range = workbook.worksheet_range(&sheet)?;

    // The range starts at the first non-empty row, not at the top of the sheet.
    let first_row = range.start().map_or(0, |(row, _)| row as usize);
    let mut rows = range.rows().skip(spec.skip_rows.saturating_sub(first_row));

    let layout = if spec.has_header {
        let header: Vec<String> = rows
            .next()
            .ok_or_else(|| EtlError::schema(format!("sheet '{sheet}' is empty; a header row was expected")))?
            .iter()
            .map(cell_to_header_string)
            .collect();
        FileLayout::resolve(fields, Some(header.as_slice()), header.len())
    } else {
        FileLayout::resolve(fields, None, range.width())
    }
    .map_err(|e| with_sheet(&sheet, e))?;

    let batch_rows = rows
        .enumerate()
        .map(|(idx0, cells)| {
            let values = layout
                .indexes
                .iter()
                .map(|&idx| convert_cell(cells.get(idx).unwrap_or(&Data::Empty)))
                .collect();
            Row::new(idx0 + 1, values)
        })
        .collect();
    Ok(Batch::new(layout.columns, batch_rows))
}

fn with_sheet(sheet: &str, err: EtlError) -> EtlError {
    match err {
        EtlError::SchemaMismatch { message } => EtlError::SchemaMismatch {
            message: format!("sheet '{sheet}': {message}"),
        },
        other => other,
    }
}

fn cell_to_header_string(c: &Data) -> String {
    match c {
        Data::String(s) => s.clone(),
        Data::Empty => String::new(),
        other => other.to_string(),
    }
}

fn convert_cell(c: &Data) -> Value {
    match c {
        Data::Empty => Value::Null,
        Data::String(s) => Value::Utf8(s.clone()),
        Data::Int(i) => Value::Int(*i),
        Data::Float(f) => Value::Float(*f),
        Data::Bool(b) => Value::Bool(*b),
        Data::DateTime(dt) => serial_to_datetime(dt.as_f64()).map_or_else(|| Value::Utf8(c.to_string()), Value::DateTime),
        Data::DateTimeIso(s) => parse_temporal(s).map_or_else(|| Value::Utf8(s.clone()), |t| Value::DateTime(t.to_datetime())),
        other => Value::Utf8(other.to_string()),
    }
}

/// Spreadsheet serial date (days since 1899-12-30) to a datetime.
fn serial_to_datetime(serial: f64) -> Option<NaiveDateTime> {
    if !serial.is_finite() {
        return None;
    }
    let epoch = NaiveDate::from_ymd_opt(1899, 12, 30)?.and_hms_opt(0, 0, 0)?;
    let millis = (serial * 86_400_000.0).round();
    if millis.abs() > i64::MAX as f64 {
        return None;
    }
    epoch.checked_add_signed(Duration::milliseconds(millis as i64))
}

#[cfg(test)]
mod tests {
    use calamine::Data;
    use chrono::NaiveDate;

    use super::{convert_cell, serial_to_datetime};
    use crate::types::Value;

    #[test]
    fn converts_basic_cells() {
        assert_eq!(convert_cell(&Data::Empty), Value::Null);
        assert_eq!(convert_cell(&Data::Int(3)), Value::Int(3));
        assert_eq!(convert_cell(&Data::String("x".into())), Value::from("x"));
        assert_eq!(convert_cell(&Data::Bool(true)), Value::Bool(true));
    }

    #[test]
    fn serial_dates_start_at_1899_12_30() {
        let dt = serial_to_datetime(45_366.5).unwrap();
        assert_eq!(dt.date(), NaiveDate::from_ymd_opt(2024, 3, 15).unwrap());
        assert_eq!(dt.format("%H:%M").to_string(), "12:00");
    }
}
