use super::{Artifact, OutputSink};
use crate::error::EtlResult;
use crate::types::Batch;

/// Collects the output table and hands it back on `finalize`. Nothing touches the filesystem.
#[derive(Debug)]
pub struct MemorySink {
    buffer: Batch,
    rows_written: usize,
}

impl MemorySink {
    pub fn new(columns: Vec<String>) -> Self {
        Self {
            buffer: Batch::empty(columns),
            rows_written: 0,
        }
    }
}

impl OutputSink for MemorySink {
    fn append(&mut self, batch: Batch) -> EtlResult<()> {
        self.rows_written += batch.row_count();
        self.buffer.append(batch);
        Ok(())
    }

    fn flush(&mut self) -> EtlResult<()> {
        Ok(())
    }

    fn finalize(&mut self) -> EtlResult<Artifact> {
        let columns = self.buffer.columns.clone();
        Ok(Artifact::InProcess(std::mem::replace(
            &mut self.buffer,
            Batch::empty(columns),
        )))
    }

    fn rows_written(&self) -> usize {
        self.rows_written
    }
}
