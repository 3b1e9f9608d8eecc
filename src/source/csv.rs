//! Streaming delimited-text reader.

use std::fs::File;
use std::io::Read;
use std::path::Path;

use csv::{StringRecord, StringRecordsIntoIter};

use super::{ChunkSource, FileLayout};
use crate::config::{SourceField, SourceFile};
use crate::error::{EtlError, EtlResult};
use crate::types::{Batch, Row, Value};

/// Reads a delimited file in chunks, keeping only the used source fields.
///
/// Rules:
///
/// - `skip_rows` leading records are discarded before anything else.
/// - With a header, used fields are located by header name (order can differ).
/// - The file must have exactly one column per configured source field of this file, on every
///   data row. Skipped leading rows may have any width.
/// - Cells are read as raw strings; typing happens later, during coercion.
pub struct CsvChunkReader<R: Read> {
    records: StringRecordsIntoIter<R>,
    pending: Option<StringRecord>,
    layout: FileLayout,
    width: usize,
    next_position: usize,
}

impl CsvChunkReader<File> {
    pub fn from_path(path: impl AsRef<Path>, spec: &SourceFile, fields: &[&SourceField]) -> EtlResult<Self> {
        let file = File::open(path)?;
        Self::from_reader(file, spec, fields)
    }
}

impl<R: Read> CsvChunkReader<R> {
    pub fn from_reader(rdr: R, spec: &SourceFile, fields: &[&SourceField]) -> EtlResult<Self> {
        let reader = csv::ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .delimiter(spec.delimiter_byte())
            .from_reader(rdr);
        let mut records = reader.into_records();

        for _ in 0..spec.skip_rows {
            if records.next().transpose()?.is_none() {
                break;
            }
        }

        let (layout, pending) = if spec.has_header {
            let header = records
                .next()
                .transpose()?
                .ok_or_else(|| EtlError::schema("the file is empty; a header row was expected"))?;
            let names: Vec<String> = header.iter().map(str::to_owned).collect();
            (FileLayout::resolve(fields, Some(names.as_slice()), names.len())?, None)
        } else {
            let first = records.next().transpose()?;
            let layout = match &first {
                Some(record) => FileLayout::resolve(fields, None, record.len())?,
                None => FileLayout::resolve(fields, None, fields.len())?,
            };
            (layout, first)
        };

        Ok(Self {
            records,
            pending,
            layout,
            width: fields.len(),
            next_position: 1,
        })
    }

    pub fn columns(&self) -> &[String] {
        &self.layout.columns
    }

    fn make_row(&mut self, record: &StringRecord) -> EtlResult<Row> {
        if record.len() != self.width {
            return Err(EtlError::schema(format!(
                "Row {} has {} fields, but {} were expected. Please check the file or your template.",
                self.next_position,
                record.len(),
                self.width
            )));
        }
        let values = self
            .layout
            .indexes
            .iter()
            .map(|&idx| Value::Utf8(record.get(idx).unwrap_or("").to_owned()))
            .collect();
        let row = Row::new(self.next_position, values);
        self.next_position += 1;
        Ok(row)
    }
}

impl<R: Read> ChunkSource for CsvChunkReader<R> {
    fn next_chunk(&mut self, max_rows: usize) -> EtlResult<Option<Batch>> {
        let mut rows = Vec::new();
        while rows.len() < max_rows.max(1) {
            let record = match self.pending.take() {
                Some(record) => record,
                None => match self.records.next().transpose()? {
                    Some(record) => record,
                    None => break,
                },
            };
            rows.push(self.make_row(&record)?);
        }

        if rows.is_empty() {
            return Ok(None);
        }
        Ok(Some(Batch::new(self.layout.columns.clone(), rows)))
    }
}

#[cfg(test)]
mod tests {
    use super::CsvChunkReader;
    use crate::config::{FileType, SourceField, SourceFile};
    use crate::error::EtlError;
    use crate::source::ChunkSource;
    use crate::types::Value;

    fn fields() -> Vec<SourceField> {
        vec![
            SourceField::new("id", 0),
            SourceField::new("name", 0),
            SourceField::new("note", 0).unused(),
        ]
    }

    #[test]
    fn reads_reordered_header_in_chunks() {
        let input = "title line\nname,note,id\nada,x,1\nbob,y,2\ncy,z,3\n";
        let spec = SourceFile::new(FileType::Csv).with_header(true).with_skip_rows(1);
        let owned = fields();
        let refs: Vec<&SourceField> = owned.iter().collect();
        let mut reader = CsvChunkReader::from_reader(input.as_bytes(), &spec, &refs).unwrap();
        assert_eq!(reader.columns(), ["id", "name"]);

        let first = reader.next_chunk(2).unwrap().unwrap();
        assert_eq!(first.row_count(), 2);
        assert_eq!(first.rows[0].values, vec![Value::from("1"), Value::from("ada")]);

        let second = reader.next_chunk(2).unwrap().unwrap();
        assert_eq!(second.rows[0].position, 3);
        assert_eq!(second.rows[0].values[1], Value::from("cy"));
        assert!(reader.next_chunk(2).unwrap().is_none());
    }

    #[test]
    fn headerless_files_map_by_order() {
        let input = "1;ada;x\n2;bob;y\n";
        let mut spec = SourceFile::new(FileType::Csv);
        spec.delimiter = ";".to_string();
        let owned = fields();
        let refs: Vec<&SourceField> = owned.iter().collect();
        let mut reader = CsvChunkReader::from_reader(input.as_bytes(), &spec, &refs).unwrap();

        let all = reader.next_chunk(100).unwrap().unwrap();
        assert_eq!(all.row_count(), 2);
        assert_eq!(all.rows[1].values, vec![Value::from("2"), Value::from("bob")]);
        assert_eq!(all.rows[1].position, 2);
    }

    #[test]
    fn missing_header_column_is_reported() {
        let input = "id,label,note\n1,a,b\n";
        let spec = SourceFile::new(FileType::Csv).with_header(true);
        let owned = fields();
        let refs: Vec<&SourceField> = owned.iter().collect();
        let err = CsvChunkReader::from_reader(input.as_bytes(), &spec, &refs).err().unwrap();
        match err {
            EtlError::SchemaMismatch { message } => assert!(message.contains("'name'"), "{message}"),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn column_count_mismatch_is_reported() {
        let input = "1,ada\n";
        let spec = SourceFile::new(FileType::Csv);
        let owned = fields();
        let refs: Vec<&SourceField> = owned.iter().collect();
        let err = CsvChunkReader::from_reader(input.as_bytes(), &spec, &refs).err().unwrap();
        assert!(err.to_string().contains("3 fields were expected in the file, but 2 were found"));
    }

    #[test]
    fn ragged_data_row_is_reported() {
        let input = "id,name,note
1,ada,x
2,bob
3,cy,z,extra
";
        let spec = SourceFile::new(FileType::Csv).with_header(true);
        let owned = fields();
        let refs: Vec<&SourceField> = owned.iter().collect();
        let mut reader = CsvChunkReader::from_reader(input.as_bytes(), &spec, &refs).unwrap();

        let err = reader.next_chunk(10).unwrap_err();
        match err {
            EtlError::SchemaMismatch { message } => {
                assert_eq!(
                    message,
                    "Row 2 has 2 fields, but 3 were expected. Please check the file or your template."
                )
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
