use std::path::PathBuf;

use serde::ser::{Serialize, SerializeMap, SerializeSeq, Serializer};

use super::{append_bytes, Artifact, OutputSink};
use crate::config::OutputFile;
use crate::error::EtlResult;
use crate::types::{Batch, Row};

/// Streams an array of objects (or one object per line).
///
/// Every flush serializes its chunk as a complete array and then stitches it onto what is already
/// on disk: the first chunk keeps its opening bracket, later chunks swap it for a comma, and every
/// chunk loses its closing bracket. `finalize` writes the one closing bracket.
#[derive(Debug)]
pub struct JsonSink {
    path: PathBuf,
    columns: Vec<String>,
    indent: usize,
    line_delimited: bool,
    pending: Option<Batch>,
    started: bool,
    rows_written: usize,
}

impl JsonSink {
    pub fn new(path: PathBuf, output: &OutputFile, columns: Vec<String>) -> Self {
        Self {
            path,
            columns,
            indent: output.indent,
            line_delimited: output.line_delimited_json,
            pending: None,
            started: false,
            rows_written: 0,
        }
    }

    fn to_array(&self, rows: &[Row]) -> EtlResult<Vec<u8>> {
        let records = Records {
            columns: &self.columns,
            rows,
        };
        if self.indent == 0 {
            return Ok(serde_json::to_vec(&records)?);
        }
        let indent = vec![b' '; self.indent];
        let mut out = Vec::new();
        let formatter = serde_json::ser::PrettyFormatter::with_indent(&indent);
        let mut ser = serde_json::Serializer::with_formatter(&mut out, formatter);
        records.serialize(&mut ser)?;
        Ok(out)
    }

    fn closing(&self) -> &'static str {
        if self.indent == 0 { "]" } else { "\n]" }
    }

    fn stitch(&self, rows: &[Row]) -> EtlResult<Vec<u8>> {
        let array = self.to_array(rows)?;
        let closing = self.closing().as_bytes();
        let body = array
            .strip_prefix(b"[")
            .and_then(|rest| rest.strip_suffix(closing))
            .unwrap_or(&array);

        let mut out = Vec::with_capacity(body.len() + 1);
        out.push(if self.started { b',' } else { b'[' });
        out.extend_from_slice(body);
        Ok(out)
    }

    fn lines(&self, rows: &[Row]) -> EtlResult<Vec<u8>> {
        let mut out = Vec::new();
        for row in rows {
            let record = Record {
                columns: &self.columns,
                row,
            };
            serde_json::to_writer(&mut out, &record)?;
            out.push(b'\n');
        }
        Ok(out)
    }
}

impl OutputSink for JsonSink {
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
        if batch.is_empty() {
            return Ok(());
        }
        let bytes = if self.line_delimited {
            self.lines(&batch.rows)?
        } else {
            self.stitch(&batch.rows)?
        };
        append_bytes(&self.path, &bytes)?;
        self.started = true;
        self.rows_written += batch.row_count();
        Ok(())
    }

    fn finalize(&mut self) -> EtlResult<Artifact> {
        self.flush()?;
        let tail = match (self.line_delimited, self.started) {
            (true, _) => "",
            (false, true) => self.closing(),
            (false, false) => "[]",
        };
        append_bytes(&self.path, tail.as_bytes())?;
        Ok(Artifact::File {
            path: self.path.clone(),
        })
    }

    fn rows_written(&self) -> usize {
        self.rows_written
    }
}

struct Records<'a> {
    columns: &'a [String],
    rows: &'a [Row],
}

impl Serialize for Records<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut seq = serializer.serialize_seq(Some(self.rows.len()))?;
        for row in self.rows {
            seq.serialize_element(&Record {
                columns: self.columns,
                row,
            })?;
        }
        seq.end()
    }
}

/// One row as an object whose keys follow column order.
struct Record<'a> {
    columns: &'a [String],
    row: &'a Row,
}

impl Serialize for Record<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.columns.len()))?;
        for (name, value) in self.columns.iter().zip(&self.row.values) {
            map.serialize_entry(name, value)?;
        }
        map.end()
    }
}
