use std::path::PathBuf;

use super::{Artifact, OutputSink};
use crate::config::OutputFile;
use crate::error::{EtlError, EtlResult};
use crate::types::Batch;

/// Rows a single worksheet can hold.
pub const MAX_EXCEL_ROWS: usize = 1_048_576;

/// Buffers the whole table and renders one worksheet on `finalize`.
#[derive(Debug)]
pub struct ExcelSink {
    path: PathBuf,
    sheet_name: String,
    has_header: bool,
    index_rows: bool,
    buffer: Batch,
}

impl ExcelSink {
    pub fn new(path: PathBuf, output: &OutputFile, columns: Vec<String>) -> Self {
        Self {
            path,
            sheet_name: output.sheet_name().to_string(),
            has_header: output.has_header,
            index_rows: output.index_rows,
            buffer: Batch::empty(columns),
        }
    }

    fn check_row_limit(&self) -> EtlResult<()> {
        let rows = self.buffer.row_count() + usize::from(self.has_header);
        if rows > MAX_EXCEL_ROWS {
            return Err(EtlError::RowLimitExceeded {
                rows,
                max_rows: MAX_EXCEL_ROWS,
            });
        }
        Ok(())
    }

    #[cfg(feature = "excel")]
    fn render(&self) -> EtlResult<()> {
        use rust_xlsxwriter::Workbook;

        use crate::types::Value;

        let mut wb = Workbook::new();
        let ws = wb.add_worksheet();
        ws.set_name(&self.sheet_name)?;

        let offset = u16::from(self.index_rows);
        let mut row_idx: u32 = 0;
        if self.has_header {
            for (col, name) in (offset..).zip(&self.buffer.columns) {
                ws.write_string(0, col, name)?;
            }
            row_idx += 1;
        }

        for row in &self.buffer.rows {
            if self.index_rows {
                ws.write_number(row_idx, 0, row.position.saturating_sub(1) as f64)?;
            }
            for (col, value) in (offset..).zip(&row.values) {
                match value {
                    Value::Null => {}
                    Value::Int(i) => {
                        ws.write_number(row_idx, col, *i as f64)?;
                    }
                    Value::Float(f) => {
                        ws.write_number(row_idx, col, *f)?;
                    }
                    Value::Bool(b) => {
                        ws.write_boolean(row_idx, col, *b)?;
                    }
                    other => {
                        ws.write_string(row_idx, col, other.to_text())?;
                    }
                }
            }
            row_idx += 1;
        }

        wb.save(&self.path)?;
        Ok(())
    }

    #[cfg(not(feature = "excel"))]
    fn render(&self) -> EtlResult<()> {
        Err(EtlError::config(
            "EXCEL output requires the `excel` feature to be enabled",
        ))
    }
}

impl OutputSink for ExcelSink {
    fn append(&mut self, batch: Batch) -> EtlResult<()> {
        self.buffer.append(batch);
        self.check_row_limit()
    }

    fn flush(&mut self) -> EtlResult<()> {
        Ok(())
    }

    fn finalize(&mut self) -> EtlResult<Artifact> {
        self.check_row_limit()?;
        self.render()?;
        Ok(Artifact::File {
            path: self.path.clone(),
        })
    }

    fn rows_written(&self) -> usize {
        self.buffer.row_count()
    }
}

#[cfg(test)]
mod tests {
    use super::{ExcelSink, MAX_EXCEL_ROWS};
    use crate::config::{FileType, OutputFile};
    use crate::error::EtlError;
    use crate::sink::OutputSink;
    use crate::types::{Batch, Row, Value};

    #[test]
    fn row_ceiling_is_enforced_before_rendering() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.xlsx");
        let output = OutputFile::new(FileType::Excel).with_header(true);
        let columns = vec!["id".to_string()];
        let mut sink = ExcelSink::new(path.clone(), &output, columns.clone());

        let rows = (1..=MAX_EXCEL_ROWS)
            .map(|i| Row::new(i, vec![Value::Null]))
            .collect();
        let err = sink.append(Batch::new(columns, rows)).unwrap_err();
        assert!(matches!(
            err,
            EtlError::RowLimitExceeded { rows, max_rows: MAX_EXCEL_ROWS } if rows == MAX_EXCEL_ROWS + 1
        ));
        assert!(!path.exists());
    }

    #[cfg(feature = "excel")]
    #[test]
    fn renders_sheet_with_header_and_index() {
        use calamine::{open_workbook_auto, Data, Reader};

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.xlsx");
        let mut output = OutputFile::new(FileType::Excel).with_header(true);
        output.index_rows = true;
        output.sheet_name = Some("People".to_string());
        let columns = vec!["id".to_string(), "name".to_string(), "active".to_string()];
        let mut sink = ExcelSink::new(path.clone(), &output, columns.clone());

        sink.append(Batch::new(
            columns,
            vec![Row::new(3, vec![Value::Int(1), Value::from("Ada"), Value::Bool(true)])],
        ))
        .unwrap();
        sink.flush().unwrap();
        sink.finalize().unwrap();
        assert_eq!(sink.rows_written(), 1);

        let mut wb = open_workbook_auto(&path).unwrap();
        let range = wb.worksheet_range("People").unwrap();
        assert_eq!(range.get_value((0, 1)), Some(&Data::String("id".to_string())));
        assert_eq!(range.get_value((1, 0)), Some(&Data::Float(2.0)));
        assert_eq!(range.get_value((1, 2)), Some(&Data::String("Ada".to_string())));
        assert_eq!(range.get_value((1, 3)), Some(&Data::Bool(true)));
    }
}
