//! Streaming fixed-width reader.

use std::fs::File;
use std::io::{BufRead, BufReader, Lines};
use std::ops::Range;
use std::path::Path;

use super::ChunkSource;
use crate::config::{SourceField, SourceFile};
use crate::error::{EtlError, EtlResult};
use crate::types::{Batch, Row, Value};

/// Reads a fixed-width text file in chunks.
///
/// Each source field of the file carries a `[start, end)` character span; cells are sliced out of
/// every line and trimmed. Whitespace-only lines are skipped and do not count as rows.
pub struct FwfChunkReader<R: BufRead> {
    lines: Lines<R>,
    columns: Vec<String>,
    spans: Vec<Range<usize>>,
    next_position: usize,
}

impl FwfChunkReader<BufReader<File>> {
    pub fn from_path(path: impl AsRef<Path>, spec: &SourceFile, fields: &[&SourceField]) -> EtlResult<Self> {
        let file = File::open(path)?;
        Self::from_reader(BufReader::new(file), spec, fields)
    }
}

impl<R: BufRead> FwfChunkReader<R> {
    pub fn from_reader(rdr: R, spec: &SourceFile, fields: &[&SourceField]) -> EtlResult<Self> {
        let mut lines = rdr.lines();
        for _ in 0..spec.skip_rows {
            if lines.next().transpose()?.is_none() {
                break;
            }
        }

        let all_spans = fields
            .iter()
            .map(|f| {
                f.char_range().ok_or_else(|| {
                    EtlError::config(format!("Field '{}' does not have column markers set.", f.name))
                })
            })
            .collect::<EtlResult<Vec<_>>>()?;

        if spec.has_header {
            let header = lines
                .next()
                .transpose()?
                .ok_or_else(|| EtlError::schema("the file is empty; a header row was expected"))?;
            for (field, span) in fields.iter().zip(&all_spans) {
                let found = slice_chars(&header, span).trim();
                if found != field.name {
                    return Err(EtlError::schema(format!(
                        "Expected header field '{}' was not found in the file (found '{found}').",
                        field.name
                    )));
                }
            }
        }

        let (columns, spans) = fields
            .iter()
            .zip(all_spans)
            .filter(|(f, _)| f.used)
            .map(|(f, span)| (f.name.clone(), span))
            .unzip();

        Ok(Self {
            lines,
            columns,
            spans,
            next_position: 1,
        })
    }
}

impl<R: BufRead> ChunkSource for FwfChunkReader<R> {
    fn next_chunk(&mut self, max_rows: usize) -> EtlResult<Option<Batch>> {
        let mut rows = Vec::new();
        while rows.len() < max_rows.max(1) {
            let Some(line) = self.lines.next().transpose()? else {
                break;
            };
            if line.trim().is_empty() {
                continue;
            }
            let values = self
                .spans
                .iter()
                .map(|span| Value::Utf8(slice_chars(&line, span).trim().to_owned()))
                .collect();
            rows.push(Row::new(self.next_position, values));
            self.next_position += 1;
        }

        if rows.is_empty() {
            return Ok(None);
        }
        Ok(Some(Batch::new(self.columns.clone(), rows)))
    }
}

/// Slice `line` by character positions, clamping to the line length.
fn slice_chars<'a>(line: &'a str, span: &Range<usize>) -> &'a str {
    let byte_at = |n: usize| line.char_indices().nth(n).map_or(line.len(), |(i, _)| i);
    let start = byte_at(span.start);
    let end = byte_at(span.end).max(start);
    &line[start..end]
}
