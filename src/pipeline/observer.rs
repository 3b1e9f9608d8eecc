use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use super::ProcessingStage;

/// Events emitted by [`super::FileProcessor`] while it runs.
#[derive(Debug, Clone, PartialEq)]
pub enum PipelineEvent {
    RunStarted { chunk_size: usize },
    StageChanged { stage: ProcessingStage },
    /// `index` is 1-based.
    ChunkStarted { index: usize, rows: usize },
    ChunkFinished {
        index: usize,
        rows_in: usize,
        rows_out: usize,
    },
    DiagnosticsWritten {
        path: PathBuf,
        errors: usize,
        warnings: usize,
    },
    RunFinished {
        elapsed: Duration,
        rows_written: usize,
    },
    RunFailed { stage: ProcessingStage, message: String },
}

/// Observer hook for pipeline events.
///
/// Implementors can drive progress bars, collect metrics or forward events elsewhere. The
/// processor already logs through `tracing`; observers are for programmatic consumers.
pub trait PipelineObserver: Send + Sync {
    fn on_event(&self, event: &PipelineEvent);
}

/// Fans every event out to a list of observers.
#[derive(Default)]
pub struct CompositeObserver {
    observers: Vec<Arc<dyn PipelineObserver>>,
}

impl CompositeObserver {
    pub fn new(observers: Vec<Arc<dyn PipelineObserver>>) -> Self {
        Self { observers }
    }
}

impl fmt::Debug for CompositeObserver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompositeObserver")
            .field("observers_len", &self.observers.len())
            .finish()
    }
}

impl PipelineObserver for CompositeObserver {
    fn on_event(&self, event: &PipelineEvent) {
        for o in &self.observers {
            o.on_event(event);
        }
    }
}
