//! `tabular-etl` is a configuration-driven ETL engine: a JSON template describes source files,
//! source fields, output fields and per-field transformation chains, and a
//! [`pipeline::FileProcessor`] streams records through them into an output file.
//!
//! The primary entrypoint is [`pipeline::FileProcessor::process`], which opens the configured
//! sources, runs them chunk by chunk and writes the configured output format.
//!
//! ## What a run does
//!
//! For every chunk (at most [`pipeline::ProcessorOptions::chunk_size`] rows), in this order:
//!
//! - **Mapping**: copy each output field's source column, or merge several source columns with
//!   the configured delimiters ([`mapping`])
//! - **Validation**: blank strings become nulls, nullable fields get their replacement value,
//!   rows with missing required values are dropped with a warning, and every column is coerced to
//!   its declared type ([`coercion`])
//! - **Transformation**: each field's `MODIFY_*` / `VALIDATE_BY_*` / `FILTER_BY_*` chain runs over
//!   its cells ([`transform`])
//! - **Writing**: the chunk is handed to the output sink ([`sink`])
//!
//! Errors and warnings are collected into [`pipeline::Diagnostics`] and written to
//! `errors_and_warnings.txt`. If a chunk records any error, the run stops after writing that
//! chunk and returns [`EtlError::DataErrors`].
//!
//! **Input formats:** CSV and fixed-width (streamed), JSON / NDJSON and spreadsheets (loaded
//! whole; spreadsheets require the Cargo feature `excel`, on by default), or in-memory records.
//!
//! **Output formats:** CSV, JSON (array or line-delimited), fixed-width, `.xlsx` (feature
//! `excel`), or the output table itself.
//!
//! ## Quick example
//!
//! ```rust
//! use tabular_etl::config::Configuration;
//! use tabular_etl::pipeline::{FileProcessor, ProcessorOptions};
//! use tabular_etl::sink::Artifact;
//! use tabular_etl::types::{Batch, Value};
//!
//! let template = r#"{
//!     "sourceFiles": [{"type": "IN_PROCESS"}],
//!     "sourceFields": [{"name": "first", "fileIndex": 0}, {"name": "last", "fileIndex": 0}],
//!     "outputFile": {"type": "IN_PROCESS"},
//!     "outputFields": [{
//!         "name": "full_name",
//!         "type": "STRING",
//!         "sourceFields": [0, 1],
//!         "mergeDelimiters": [" "],
//!         "transformations": [{"operation": "MODIFY_CHANGE_CASE", "parameters": {"operator": "UPPER"}}]
//!     }]
//! }"#;
//! let configuration =
//!     Configuration::from_json_str("0f8fad5b-d9cb-469f-a165-70867728950e", template).unwrap();
//!
//! let records = Batch::from_values(
//!     vec!["first".to_string(), "last".to_string()],
//!     vec![vec![Value::from("ada"), Value::from("lovelace")]],
//! );
//! let mut processor = FileProcessor::new(configuration, ProcessorOptions::default());
//! let summary = processor.process_batch(records).unwrap();
//!
//! let Artifact::InProcess(output) = summary.artifact else { unreachable!() };
//! assert_eq!(output.rows[0].values, vec![Value::from("ADA LOVELACE")]);
//! ```
//!
//! ## Modules
//!
//! - [`config`]: template loading and validation
//! - [`pipeline`]: the chunk loop, stages, diagnostics and observer hooks
//! - [`source`] / [`sink`]: format-specific readers and writers
//! - [`mapping`], [`coercion`], [`transform`]: the per-chunk stages
//! - [`types`]: cells, rows and batches
//! - [`error`]: the crate error type

pub mod coercion;
pub mod config;
pub mod error;
pub mod mapping;
pub mod paths;
pub mod pipeline;
pub mod sink;
pub mod source;
pub mod temporal;
pub mod transform;
pub mod types;

pub use error::{EtlError, EtlResult};
