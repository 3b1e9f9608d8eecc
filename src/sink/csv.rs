use std::path::PathBuf;

use super::{append_bytes, Artifact, OutputSink};
use crate::config::OutputFile;
use crate::error::{EtlError, EtlResult};
use crate::types::Batch;

/// Streams delimited text; the header (if any) is written with the first flush only.
#[derive(Debug)]
pub struct CsvSink {
    path: PathBuf,
    columns: Vec<String>,
    delimiter: u8,
    has_header: bool,
    index_rows: bool,
    pending: Option<Batch>,
    started: bool,
    rows_written: usize,
}

impl CsvSink {
    pub fn new(path: PathBuf, output: &OutputFile, columns: Vec<String>) -> Self {
        Self {
            path,
            columns,
            delimiter: output.delimiter_byte(),
            has_header: output.has_header,
            index_rows: output.index_rows,
            pending: None,
            started: false,
            rows_written: 0,
        }
    }

    fn render(&self, batch: &Batch) -> EtlResult<Vec<u8>> {
        let mut wtr = csv::WriterBuilder::new()
            .delimiter(self.delimiter)
            .from_writer(Vec::new());

        if !self.started && self.has_header {
            let mut header: Vec<&str> = Vec::with_capacity(self.columns.len() + 1);
            if self.index_rows {
                header.push("");
            }
            header.extend(self.columns.iter().map(String::as_str));
            wtr.write_record(&header)?;
        }

        for row in &batch.rows {
            let mut record: Vec<String> = Vec::with_capacity(row.values.len() + 1);
            if self.index_rows {
                record.push(row.position.saturating_sub(1).to_string());
            }
            record.extend(row.values.iter().map(|v| v.to_text()));
            wtr.write_record(&record)?;
        }

        wtr.into_inner().map_err(|e| EtlError::Io(e.into_error()))
    }
}

impl OutputSink for CsvSink {
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
        let bytes = self.render(&batch)?;
        append_bytes(&self.path, &bytes)?;
        self.started = true;
        self.rows_written += batch.row_count();
        Ok(())
    }

    fn finalize(&mut self) -> EtlResult<Artifact> {
        self.flush()?;
        if !self.started {
            // Nothing was ever flushed: still leave a (header-only) file behind.
            let empty = Batch::empty(self.columns.clone());
            let bytes = self.render(&empty)?;
            append_bytes(&self.path, &bytes)?;
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
