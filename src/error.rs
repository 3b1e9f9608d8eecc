use std::path::PathBuf;

use thiserror::Error;

/// Convenience result type used across the crate.
pub type EtlResult<T> = Result<T, EtlError>;

/// Error type returned by configuration loading, sources, sinks and the pipeline.
///
/// Row-level data problems are *not* surfaced through this type one by one; they are collected
/// into [`crate::pipeline::Diagnostics`] and reported as a single [`EtlError::DataErrors`] once the
/// run aborts.
#[derive(Debug, Error)]
pub enum EtlError {
    /// Underlying I/O error (e.g. permission denied, disk full).
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// CSV read/write error.
    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),

    /// JSON parse/serialize error.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[cfg(feature = "excel")]
    /// Excel ingestion error (feature-gated behind `excel`).
    #[error("excel error: {0}")]
    Excel(#[from] calamine::Error),

    #[cfg(feature = "excel")]
    /// Excel output error (feature-gated behind `excel`).
    #[error("xlsx writer error: {0}")]
    Xlsx(#[from] rust_xlsxwriter::XlsxError),

    /// The configuration template is malformed or inconsistent.
    #[error("invalid configuration: {message}")]
    Config { message: String },

    /// The input does not conform to the configuration (missing header column, wrong column
    /// count, missing record field, etc.).
    #[error("schema mismatch: {message}")]
    SchemaMismatch { message: String },

    /// A source file does not exist (or is not a regular file).
    #[error("file does not exist: {}", path.display())]
    FileNotFound { path: PathBuf },

    /// A source file exceeds the configured size limit.
    #[error("file {} is {size} bytes, which exceeds the limit of {max_size} bytes", path.display())]
    FileTooLarge {
        path: PathBuf,
        size: u64,
        max_size: u64,
    },

    /// The output would exceed the row ceiling of a whole-file format.
    #[error(
        "Excel has a maximum row limit of {max_rows} rows, but the output would contain {rows} rows. \
         Please output to another format (for example, CSV) or reduce the number of rows processed."
    )]
    RowLimitExceeded { rows: usize, max_rows: usize },

    /// Row-level errors were recorded; the run was aborted after the offending chunk.
    #[error(
        "encountered {errors} error(s) and {warnings} warning(s) while processing; see the errors \
         and warnings file for details"
    )]
    DataErrors { errors: usize, warnings: usize },
}

impl EtlError {
    pub(crate) fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    pub(crate) fn schema(message: impl Into<String>) -> Self {
        Self::SchemaMismatch {
            message: message.into(),
        }
    }
}
