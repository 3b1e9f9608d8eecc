use std::fmt;

/// Where a [`super::FileProcessor`] currently is in a run.
///
/// Per chunk the stage cycles `RetrievingData -> Mapping -> Validating -> Transforming ->
/// WritingData`; after the last chunk it moves to `WritingErrors` and `FinalizingOutput`.
/// `Error` is terminal for the run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProcessingStage {
    Initializing,
    RetrievingData,
    Mapping,
    Validating,
    Transforming,
    WritingData,
    WritingErrors,
    FinalizingOutput,
    Error,
}

impl ProcessingStage {
    /// Human-readable label for progress reporting.
    pub fn description(self) -> &'static str {
        match self {
            Self::Initializing => "Initializing...",
            Self::RetrievingData => "Retrieving data...",
            Self::Mapping => "Mapping data...",
            Self::Validating => "Validating data...",
            Self::Transforming => "Transforming data...",
            Self::WritingData => "Writing data...",
            Self::WritingErrors => "Writing errors and warnings...",
            Self::FinalizingOutput => "Finalizing output...",
            Self::Error => "Error",
        }
    }

    pub fn is_terminal(self) -> bool {
        self == Self::Error
    }
}

impl fmt::Display for ProcessingStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.description())
    }
}
