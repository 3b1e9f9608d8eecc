//! Output sinks.
//!
//! Two disciplines share the [`OutputSink`] trait:
//!
//! - **streaming** (CSV, JSON, fixed-width): `flush` serializes the pending batch and appends it to
//!   the destination right away, so at most one chunk is held in memory;
//! - **buffered** (Excel, in-process): `append` accumulates everything and `finalize` renders or
//!   returns the whole table at once.

mod csv;
mod excel;
mod fwf;
mod json;
mod memory;

use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::config::{FileType, OutputField, OutputFile};
use crate::error::{EtlError, EtlResult};
use crate::paths::remove_existing;
use crate::types::Batch;

pub use self::csv::CsvSink;
pub use self::excel::{ExcelSink, MAX_EXCEL_ROWS};
pub use self::fwf::FwfSink;
pub use self::json::JsonSink;
pub use self::memory::MemorySink;

/// What a finished run produced.
#[derive(Debug, Clone, PartialEq)]
pub enum Artifact {
    /// A file on disk.
    File { path: PathBuf },
    /// The output table itself (in-process output).
    InProcess(Batch),
}

/// Destination for processed batches.
pub trait OutputSink {
    /// Queue a batch for writing.
    fn append(&mut self, batch: Batch) -> EtlResult<()>;

    /// Persist whatever was appended since the last flush (a no-op for buffered sinks).
    fn flush(&mut self) -> EtlResult<()>;

    /// Complete the artifact. Called once, after the last flush.
    fn finalize(&mut self) -> EtlResult<Artifact>;

    /// Rows accepted so far.
    fn rows_written(&self) -> usize;
}

/// Pick the sink for `output`. Any previous file at `destination` is removed first.
pub fn create_sink(
    output: &OutputFile,
    fields: &[OutputField],
    destination: Option<&Path>,
) -> EtlResult<Box<dyn OutputSink>> {
    let columns: Vec<String> = fields.iter().map(|f| f.name.clone()).collect();
    if output.file_type == FileType::InProcess {
        return Ok(Box::new(MemorySink::new(columns)));
    }

    let path = destination
        .ok_or_else(|| EtlError::config(format!("an output path is required for {} output", output.file_type)))?
        .to_path_buf();
    remove_existing(&path)?;

    Ok(match output.file_type {
        FileType::Csv => Box::new(CsvSink::new(path, output, columns)),
        FileType::Json => Box::new(JsonSink::new(path, output, columns)),
        FileType::Fwf => Box::new(FwfSink::new(path, output, fields)?),
        FileType::Excel => Box::new(ExcelSink::new(path, output, columns)),
        FileType::InProcess => Box::new(MemorySink::new(columns)),
    })
}

/// Append `bytes` to `path`, creating the file if needed. The handle is dropped before returning.
pub(crate) fn append_bytes(path: &Path, bytes: &[u8]) -> EtlResult<()> {
    let mut file = OpenOptions::new().create(true).append(true).open(path)?;
    file.write_all(bytes)?;
    Ok(())
}
