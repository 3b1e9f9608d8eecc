use std::path::PathBuf;

use super::{append_bytes, Artifact, OutputSink};
use crate::config::{OutputField, OutputFile};
use crate::error::{EtlError, EtlResult};
use crate::types::{Batch, Value};

/// Streams fixed-width text. Cells are left-justified and cut to their column width.
#[derive(Debug)]
pub struct FwfSink {
    path: PathBuf,
    columns: Vec<String>,
    widths: Vec<usize>,
    has_header: bool,
    pending: Option<Batch>,
    started: bool,
    rows_written: usize,
}

impl FwfSink {
    pub fn new(path: PathBuf, output: &OutputFile, fields: &[OutputField]) -> EtlResult<Self> {
        let widths = fields
            .iter()
            .map(|f| {
                f.width()
                    .ok_or_else(|| EtlError::config(format!("Field '{}' does not have column markers set.", f.name)))
            })
            .collect::<EtlResult<Vec<_>>>()?;
        Ok(Self {
            path,
            columns: fields.iter().map(|f| f.name.clone()).collect(),
            widths,
            has_header: output.has_header,
            pending: None,
            started: false,
            rows_written: 0,
        })
    }

    fn line(&self, cells: impl Iterator<Item = String>, out: &mut String) {
        for (cell, &width) in cells.zip(&self.widths) {
            let mut taken = 0;
            for c in cell.chars().take(width) {
                out.push(c);
                taken += 1;
            }
            out.extend(std::iter::repeat_n(' ', width - taken));
        }
        out.push('\n');
    }

    fn render(&self, batch: &Batch) -> String {
        let mut out = String::new();
        if !self.started && self.has_header {
            self.line(self.columns.iter().cloned(), &mut out);
        }
        for row in &batch.rows {
            self.line(row.values.iter().map(Value::to_text), &mut out);
        }
        out
    }
}

impl OutputSink for FwfSink {
    fn append(&mut self, batch: Batch) -> EtlResult<()> {
        match self.pending.as_mut() {
            Some(pending) => pending.append(batch),
            None => self.pending = Some(batch),
        }
        Ok(())
    }

    fn flush(&mut self) -> EtlResult<()> {
        let Some(batch) = self.pending.take() else {
            return Ok(());
        };
        let text = self.render(&batch);
        append_bytes(&self.path, text.as_bytes())?;
        self.started = true;
        self.rows_written += batch.row_count();
        Ok(())
    }

    fn finalize(&mut self) -> EtlResult<Artifact> {
        self.flush()?;
        if !self.started {
            let text = self.render(&Batch::empty(self.columns.clone()));
            append_bytes(&self.path, text.as_bytes())?;
            self.started = true;
        }
        Ok(Artifact::File {
            path: self.path.clone(),
        })
    }

    fn rows_written(&self) -> usize {
        self.rows_written
    }
}
