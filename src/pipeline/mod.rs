//! The staged, chunked processing loop.
//!
//! [`FileProcessor`] pulls bounded batches from a [`ChunkSource`] and pushes each one through
//! mapping, validation/coercion and the transformation chains before handing it to an
//! [`OutputSink`]. Row-level problems are collected into [`Diagnostics`]; once a chunk records an
//! error the run stops after that chunk has been written.
//!
//! ```no_run
//! use tabular_etl::config::Configuration;
//! use tabular_etl::pipeline::{FileProcessor, ProcessRequest, ProcessorOptions};
//!
//! # fn main() -> Result<(), tabular_etl::EtlError> {
//! let configuration = Configuration::from_path("0f8fad5b-d9cb-469f-a165-70867728950e", "template.json")?;
//! let mut processor = FileProcessor::new(configuration, ProcessorOptions::default());
//! let summary = processor.process(
//!     ProcessRequest::from_files(vec!["people.csv".into()]).with_output("out/"),
//! )?;
//! println!("rows={}", summary.rows_written);
//! # Ok(())
//! # }
//! ```

mod diagnostics;
mod observer;
mod stage;

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use tracing::{debug, info, warn};

use crate::coercion::prepare;
use crate::config::Configuration;
use crate::error::{EtlError, EtlResult};
use crate::mapping::map_fields;
use crate::paths::resolve_destination;
use crate::sink::{create_sink, Artifact, OutputSink};
use crate::source::{open_sources, ChunkSource, InMemorySource};
use crate::transform::transform;
use crate::types::Batch;

pub use diagnostics::{Diagnostics, DIAGNOSTICS_FILE_NAME};
pub use observer::{CompositeObserver, PipelineEvent, PipelineObserver};
pub use stage::ProcessingStage;

/// Rows per chunk unless configured otherwise.
pub const DEFAULT_CHUNK_SIZE: usize = 1_000_000;

/// Configuration for the [`FileProcessor`].
#[derive(Clone)]
pub struct ProcessorOptions {
    /// Maximum rows per chunk. Bounds peak memory; output does not depend on it.
    pub chunk_size: usize,
    /// Cap on stored error and warning lines (combined). `None` keeps everything.
    pub max_diagnostics: Option<usize>,
    /// Reject source files larger than this many bytes.
    pub max_source_bytes: Option<u64>,
    pub observer: Option<Arc<dyn PipelineObserver>>,
}

impl Default for ProcessorOptions {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            max_diagnostics: None,
            max_source_bytes: None,
            observer: None,
        }
    }
}

impl fmt::Debug for ProcessorOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProcessorOptions")
            .field("chunk_size", &self.chunk_size)
            .field("max_diagnostics", &self.max_diagnostics)
            .field("max_source_bytes", &self.max_source_bytes)
            .field("observer", &self.observer.is_some())
            .finish()
    }
}

/// Where the records of a run come from.
#[derive(Debug, Clone, PartialEq)]
pub enum SourceInput {
    /// One path per configured source file, in configuration order.
    Files(Vec<PathBuf>),
    /// Records handed over in memory; columns are named after the source fields.
    Batch(Batch),
}

/// Inputs and destinations of one [`FileProcessor::process`] call.
#[derive(Debug, Clone, PartialEq)]
pub struct ProcessRequest {
    pub input: SourceInput,
    /// Output file, or a directory (no extension) that receives the default file name.
    pub output_path: Option<PathBuf>,
    /// Errors-and-warnings file. Defaults to [`DIAGNOSTICS_FILE_NAME`] next to the output.
    pub diagnostics_path: Option<PathBuf>,
}

impl ProcessRequest {
    pub fn from_files(paths: Vec<PathBuf>) -> Self {
        Self {
            input: SourceInput::Files(paths),
            output_path: None,
            diagnostics_path: None,
        }
    }

    pub fn from_batch(batch: Batch) -> Self {
        Self {
            input: SourceInput::Batch(batch),
            output_path: None,
            diagnostics_path: None,
        }
    }

    pub fn with_output(mut self, path: impl Into<PathBuf>) -> Self {
        self.output_path = Some(path.into());
        self
    }

    pub fn with_diagnostics(mut self, path: impl Into<PathBuf>) -> Self {
        self.diagnostics_path = Some(path.into());
        self
    }
}

/// Result of a successful run.
#[derive(Debug, Clone, PartialEq)]
pub struct RunSummary {
    pub rows_written: usize,
    pub artifact: Artifact,
}

/// Drives one configuration through the chunk loop.
pub struct FileProcessor {
    configuration: Configuration,
    options: ProcessorOptions,
    stage: ProcessingStage,
    diagnostics: Diagnostics,
}

impl FileProcessor {
    pub fn new(configuration: Configuration, options: ProcessorOptions) -> Self {
        let diagnostics = Diagnostics::new(options.max_diagnostics);
        Self {
            configuration,
            options,
            stage: ProcessingStage::Initializing,
            diagnostics,
        }
    }

    pub fn configuration(&self) -> &Configuration {
        &self.configuration
    }

    /// Current (or, after a run, last) stage.
    pub fn stage(&self) -> ProcessingStage {
        self.stage
    }

    /// Errors and warnings of the latest run.
    pub fn diagnostics(&self) -> &Diagnostics {
        &self.diagnostics
    }

    /// Open the configured sources and sink for `request` and run them.
    pub fn process(&mut self, request: ProcessRequest) -> EtlResult<RunSummary> {
        let started = self.begin();
        let result = self.process_inner(request);
        self.finish(started, result)
    }

    /// Run in-memory records through the pipeline; the output goes wherever the configuration
    /// says (in-process output returns the table itself).
    pub fn process_batch(&mut self, batch: Batch) -> EtlResult<RunSummary> {
        self.process(ProcessRequest::from_batch(batch))
    }

    /// Run an already opened source into an already created sink.
    ///
    /// The diagnostics file is written to `diagnostics_path` when given and when there is
    /// something to report; either way the collected lines stay available via
    /// [`FileProcessor::diagnostics`].
    pub fn run(
        &mut self,
        source: &mut dyn ChunkSource,
        sink: &mut dyn OutputSink,
        diagnostics_path: Option<&Path>,
    ) -> EtlResult<RunSummary> {
        let started = self.begin();
        let result = self.execute(source, sink, diagnostics_path);
        self.finish(started, result)
    }

    fn begin(&mut self) -> Instant {
        self.diagnostics = Diagnostics::new(self.options.max_diagnostics);
        self.emit(PipelineEvent::RunStarted {
            chunk_size: self.options.chunk_size,
        });
        self.set_stage(ProcessingStage::Initializing);
        Instant::now()
    }

    fn finish(&mut self, started: Instant, result: EtlResult<RunSummary>) -> EtlResult<RunSummary> {
        match result {
            Ok(summary) => {
                let elapsed = started.elapsed();
                info!(
                    rows_written = summary.rows_written,
                    warnings = self.diagnostics.warnings().len(),
                    elapsed_ms = elapsed.as_millis() as u64,
                    "run finished"
                );
                self.emit(PipelineEvent::RunFinished {
                    elapsed,
                    rows_written: summary.rows_written,
                });
                Ok(summary)
            }
            Err(err) => {
                let failed_at = self.stage;
                warn!(stage = %failed_at, error = %err, "run failed");
                self.set_stage(ProcessingStage::Error);
                self.emit(PipelineEvent::RunFailed {
                    stage: failed_at,
                    message: err.to_string(),
                });
                Err(err)
            }
        }
    }

    fn process_inner(&mut self, request: ProcessRequest) -> EtlResult<RunSummary> {
        let output = &self.configuration.output_file;
        let destination = match (&request.output_path, output.file_name()) {
            (Some(path), Some(name)) => Some(resolve_destination(path, &name)?),
            _ => None,
        };
        let diagnostics_path = request.diagnostics_path.clone().or_else(|| {
            destination
                .as_deref()
                .and_then(Path::parent)
                .map(|dir| dir.join(DIAGNOSTICS_FILE_NAME))
        });

        let mut source: Box<dyn ChunkSource> = match request.input {
            SourceInput::Files(paths) => open_sources(&self.configuration, &paths, self.options.max_source_bytes)?,
            SourceInput::Batch(batch) => {
                self.check_in_process_columns(&batch)?;
                Box::new(InMemorySource::new(batch))
            }
        };
        let mut sink = create_sink(output, &self.configuration.output_fields, destination.as_deref())?;

        self.execute(source.as_mut(), sink.as_mut(), diagnostics_path.as_deref())
    }

    fn check_in_process_columns(&self, batch: &Batch) -> EtlResult<()> {
        for field in self.configuration.source_fields.iter().filter(|f| f.used) {
            if batch.column_index(&field.name).is_none() {
                return Err(EtlError::config(format!(
                    "Expected field '{}' was not found in the in-process records.",
                    field.name
                )));
            }
        }
        Ok(())
    }

    fn execute(
        &mut self,
        source: &mut dyn ChunkSource,
        sink: &mut dyn OutputSink,
        diagnostics_path: Option<&Path>,
    ) -> EtlResult<RunSummary> {
        let chunk_size = self.options.chunk_size.max(1);
        let mut index = 0;

        loop {
            self.set_stage(ProcessingStage::RetrievingData);
            let Some(chunk) = source.next_chunk(chunk_size)? else {
                break;
            };
            index += 1;
            let rows_in = chunk.row_count();
            self.emit(PipelineEvent::ChunkStarted { index, rows: rows_in });

            self.set_stage(ProcessingStage::Mapping);
            let batch = map_fields(chunk, &self.configuration)?;

            self.set_stage(ProcessingStage::Validating);
            let batch = prepare(batch, &self.configuration, &mut self.diagnostics);

            self.set_stage(ProcessingStage::Transforming);
            let batch = transform(batch, &self.configuration, &mut self.diagnostics);

            self.set_stage(ProcessingStage::WritingData);
            let rows_out = batch.row_count();
            sink.append(batch)?;
            sink.flush()?;

            debug!(chunk = index, rows_in, rows_out, "chunk written");
            self.emit(PipelineEvent::ChunkFinished {
                index,
                rows_in,
                rows_out,
            });

            if self.diagnostics.has_errors() {
                // The chunk is already on disk; later chunks are never read.
                self.write_diagnostics(diagnostics_path)?;
                return Err(EtlError::DataErrors {
                    errors: self.diagnostics.errors().len(),
                    warnings: self.diagnostics.warnings().len(),
                });
            }
        }

        self.write_diagnostics(diagnostics_path)?;

        self.set_stage(ProcessingStage::FinalizingOutput);
        let rows_written = sink.rows_written();
        let artifact = sink.finalize()?;
        Ok(RunSummary {
            rows_written,
            artifact,
        })
    }

    fn write_diagnostics(&mut self, path: Option<&Path>) -> EtlResult<()> {
        self.set_stage(ProcessingStage::WritingErrors);
        let Some(path) = path else {
            return Ok(());
        };
        if self.diagnostics.write_to(path)? {
            self.emit(PipelineEvent::DiagnosticsWritten {
                path: path.to_path_buf(),
                errors: self.diagnostics.errors().len(),
                warnings: self.diagnostics.warnings().len(),
            });
        }
        Ok(())
    }

    fn set_stage(&mut self, stage: ProcessingStage) {
        debug!(stage = %stage, "stage changed");
        self.stage = stage;
        self.emit(PipelineEvent::StageChanged { stage });
    }

    fn emit(&self, event: PipelineEvent) {
        if let Some(obs) = &self.options.observer {
            obs.on_event(&event);
        }
    }
}

impl fmt::Debug for FileProcessor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FileProcessor")
            .field("configuration", &self.configuration.id)
            .field("options", &self.options)
            .field("stage", &self.stage)
            .finish()
    }
}
