//! Chunked record sources.
//!
//! A single CSV or fixed-width file is streamed chunk by chunk. Every other input (JSON, Excel,
//! several files at once) is loaded whole, joined column-wise by row order, and then handed out in
//! chunk-sized windows, so the pipeline sees the same [`ChunkSource`] interface either way.

mod csv;
#[cfg(feature = "excel")]
mod excel;
mod fwf;
mod json;

use std::path::{Path, PathBuf};

use tracing::debug;

use crate::config::{Configuration, FileType, SourceField, SourceFile};
use crate::error::{EtlError, EtlResult};
use crate::paths::check_source;
use crate::types::{Batch, Row, Value};

pub use self::csv::CsvChunkReader;
#[cfg(feature = "excel")]
pub use self::excel::read_excel_path;
pub use self::fwf::FwfChunkReader;
pub use self::json::{read_json_path, read_json_str};

/// Produces successive batches of at most `max_rows` rows until exhausted.
pub trait ChunkSource {
    /// The next batch, or `None` once the input is exhausted. Never returns an empty batch.
    fn next_chunk(&mut self, max_rows: usize) -> EtlResult<Option<Batch>>;
}

/// Serves an already materialized batch in windows.
#[derive(Debug, Clone, Default)]
pub struct InMemorySource {
    remaining: Batch,
}

impl InMemorySource {
    pub fn new(batch: Batch) -> Self {
        Self { remaining: batch }
    }
}

impl ChunkSource for InMemorySource {
    fn next_chunk(&mut self, max_rows: usize) -> EtlResult<Option<Batch>> {
        if self.remaining.is_empty() {
            return Ok(None);
        }
        Ok(Some(self.remaining.take_front(max_rows.max(1))))
    }
}

/// Open the configured sources at `paths` (one path per configured source file, in order).
pub fn open_sources(
    configuration: &Configuration,
    paths: &[PathBuf],
    max_source_bytes: Option<u64>,
) -> EtlResult<Box<dyn ChunkSource>> {
    if paths.len() != configuration.source_files.len() {
        return Err(EtlError::config(format!(
            "{} source file(s) are configured, but {} path(s) were supplied.",
            configuration.source_files.len(),
            paths.len()
        )));
    }
    for path in paths {
        check_source(path, max_source_bytes)?;
    }

    if configuration.can_stream() {
        let spec = &configuration.source_files[0];
        let fields = file_fields(configuration, 0);
        debug!(path = %paths[0].display(), format = %spec.file_type, "streaming source");
        return match spec.file_type {
            FileType::Fwf => Ok(Box::new(FwfChunkReader::from_path(&paths[0], spec, &fields)?)),
            _ => Ok(Box::new(CsvChunkReader::from_path(&paths[0], spec, &fields)?)),
        };
    }

    let mut batches = Vec::with_capacity(paths.len());
    for (idx, (spec, path)) in configuration.source_files.iter().zip(paths).enumerate() {
        let fields = file_fields(configuration, idx);
        debug!(path = %path.display(), format = %spec.file_type, "loading source");
        batches.push(read_whole(spec, &fields, path)?);
    }
    Ok(Box::new(InMemorySource::new(join_columns(batches))))
}

fn read_whole(spec: &SourceFile, fields: &[&SourceField], path: &Path) -> EtlResult<Batch> {
    match spec.file_type {
        FileType::Csv => drain(CsvChunkReader::from_path(path, spec, fields)?),
        FileType::Fwf => drain(FwfChunkReader::from_path(path, spec, fields)?),
        FileType::Json => read_json_path(path, spec, fields),
        #[cfg(feature = "excel")]
        FileType::Excel => read_excel_path(path, spec, fields),
        #[cfg(not(feature = "excel"))]
        FileType::Excel => Err(EtlError::config(
            "excel support not enabled (enable cargo feature 'excel')",
        )),
        FileType::InProcess => Err(EtlError::config(
            "in-process sources take a batch, not a file path",
        )),
    }
}

fn drain(mut source: impl ChunkSource) -> EtlResult<Batch> {
    let mut all: Option<Batch> = None;
    while let Some(chunk) = source.next_chunk(usize::MAX)? {
        match all.as_mut() {
            Some(batch) => batch.append(chunk),
            None => all = Some(chunk),
        }
    }
    Ok(all.unwrap_or_default())
}

/// Join batches side by side, aligning rows by index. Shorter batches are padded with nulls and
/// positions are renumbered from 1.
pub fn join_columns(batches: Vec<Batch>) -> Batch {
    if batches.len() == 1 {
        return batches.into_iter().next().unwrap_or_default();
    }
    let widths: Vec<usize> = batches.iter().map(|b| b.columns.len()).collect();
    let height = batches.iter().map(Batch::row_count).max().unwrap_or(0);
    let columns = batches.iter().flat_map(|b| b.columns.iter().cloned()).collect();

    let mut iters: Vec<_> = batches.into_iter().map(|b| b.rows.into_iter()).collect();
    let rows = (0..height)
        .map(|i| {
            let mut values = Vec::with_capacity(widths.iter().sum());
            for (rows, &width) in iters.iter_mut().zip(&widths) {
                match rows.next() {
                    Some(row) => values.extend(row.values),
                    None => values.extend(std::iter::repeat_n(Value::Null, width)),
                }
            }
            Row::new(i + 1, values)
        })
        .collect();
    Batch::new(columns, rows)
}

/// Source fields of file `file_index`, in configuration order.
pub(crate) fn file_fields(configuration: &Configuration, file_index: usize) -> Vec<&SourceField> {
    configuration
        .fields_of_file(file_index)
        .into_iter()
        .map(|(_, f)| f)
        .collect()
}

/// Which physical columns of a file feed its used source fields.
#[derive(Debug, Clone)]
pub(crate) struct FileLayout {
    pub columns: Vec<String>,
    pub indexes: Vec<usize>,
}

impl FileLayout {
    /// Match the file's columns against its source fields.
    ///
    /// The file must have exactly as many columns as there are source fields. With a header, used
    /// fields are located by name; without one, by their order in the configuration.
    pub fn resolve(fields: &[&SourceField], header: Option<&[String]>, found: usize) -> EtlResult<Self> {
        if found != fields.len() {
            return Err(EtlError::schema(format!(
                "{} fields were expected in the file, but {found} were found. Please check the file or your template.",
                fields.len()
            )));
        }

        let mut columns = Vec::new();
        let mut indexes = Vec::new();
        for (order, field) in fields.iter().enumerate() {
            if !field.used {
                continue;
            }
            let idx = match header {
                Some(names) => names
                    .iter()
                    .position(|h| h.trim() == field.name)
                    .ok_or_else(|| {
                        EtlError::schema(format!(
                            "Expected header field '{}' was not found in the file.",
                            field.name
                        ))
                    })?,
                None => order,
            };
            columns.push(field.name.clone());
            indexes.push(idx);
        }
        Ok(Self { columns, indexes })
    }
}
