//! Configuration templates: source files, source fields, the output file and output fields.
//!
//! A template is a JSON document (camelCase keys) loaded once per run and validated up front, so
//! that every inconsistency is reported as an [`EtlError::Config`] before any data is read.
//!
//! ```
//! use tabular_etl::config::Configuration;
//!
//! let template = r#"{
//!     "label": "people",
//!     "sourceFiles": [{"type": "CSV", "hasHeader": true}],
//!     "sourceFields": [{"name": "id", "fileIndex": 0}],
//!     "outputFile": {"type": "JSON"},
//!     "outputFields": [{"name": "ID", "type": "INT", "sourceFields": [0]}]
//! }"#;
//! let config = Configuration::from_json_str("fc01da57-106a-4255-be48-3e634296ce3f", template).unwrap();
//! assert_eq!(config.output_fields[0].name, "ID");
//! ```

mod transformation;

use std::fmt;
use std::fs;
use std::ops::Range;
use std::path::Path;

use serde::{Deserialize, Deserializer};

use crate::coercion::DEFAULT_TRUTHY_STRINGS;
use crate::error::{EtlError, EtlResult};
use crate::types::{DataType, Value};

pub use transformation::Transformation;

/// Required length of a configuration identifier.
pub const CONFIGURATION_ID_LEN: usize = 36;

/// Container format of a source or output file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub enum FileType {
    #[serde(rename = "CSV")]
    Csv,
    #[serde(rename = "EXCEL")]
    Excel,
    #[serde(rename = "JSON")]
    Json,
    /// Fixed-width text.
    #[serde(rename = "FWF")]
    Fwf,
    /// No file at all: records are handed over (or back) in memory.
    #[serde(rename = "IN_PROCESS")]
    InProcess,
}

impl FileType {
    /// Extension used for default output file names.
    pub fn default_extension(self) -> Option<&'static str> {
        match self {
            Self::Csv => Some("csv"),
            Self::Excel => Some("xlsx"),
            Self::Json => Some("json"),
            Self::Fwf => Some("txt"),
            Self::InProcess => None,
        }
    }

    /// Whether a single file of this type can be read incrementally.
    pub fn is_streamable(self) -> bool {
        matches!(self, Self::Csv | Self::Fwf)
    }
}

impl fmt::Display for FileType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Csv => "CSV",
            Self::Excel => "EXCEL",
            Self::Json => "JSON",
            Self::Fwf => "FWF",
            Self::InProcess => "IN_PROCESS",
        };
        f.write_str(s)
    }
}

/// One input file.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceFile {
    #[serde(rename = "type")]
    pub file_type: FileType,
    /// CSV/EXCEL/FWF: whether the first (non-skipped) line is a header.
    #[serde(default)]
    pub has_header: bool,
    /// Lines to skip at the start of the file, before the header.
    #[serde(default)]
    pub skip_rows: usize,
    /// JSON: one object per line instead of an array of objects.
    #[serde(default, rename = "lineDelimitedJSON")]
    pub line_delimited_json: bool,
    /// EXCEL: sheet to read; the first sheet when unset.
    #[serde(default, deserialize_with = "deserialize_optional_string")]
    pub sheet_name: Option<String>,
    /// CSV: single-byte field delimiter.
    #[serde(default = "default_delimiter")]
    pub delimiter: String,
}

impl SourceFile {
    /// A headerless, comma-delimited source of the given type.
    pub fn new(file_type: FileType) -> Self {
        Self {
            file_type,
            has_header: false,
            skip_rows: 0,
            line_delimited_json: false,
            sheet_name: None,
            delimiter: default_delimiter(),
        }
    }

    /// Whether the first row after the skipped ones names the columns.
    pub fn with_header(mut self, has_header: bool) -> Self {
        self.has_header = has_header;
        self
    }

    /// Discard this many leading rows before the header or data.
    pub fn with_skip_rows(mut self, skip_rows: usize) -> Self {
        self.skip_rows = skip_rows;
        self
    }

    /// The delimiter as a byte (validated to be a single byte at load time).
    pub fn delimiter_byte(&self) -> u8 {
        self.delimiter.as_bytes().first().copied().unwrap_or(b',')
    }
}

/// The output file.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OutputFile {
    #[serde(rename = "type")]
    pub file_type: FileType,
    #[serde(default)]
    pub has_header: bool,
    #[serde(default, rename = "lineDelimitedJSON")]
    pub line_delimited_json: bool,
    #[serde(default, deserialize_with = "deserialize_optional_string")]
    pub sheet_name: Option<String>,
    #[serde(default, deserialize_with = "deserialize_optional_string")]
    pub compression: Option<String>,
    /// File name used when the destination is a directory.
    #[serde(default, deserialize_with = "deserialize_optional_string")]
    pub name: Option<String>,
    #[serde(default = "default_delimiter")]
    pub delimiter: String,
    /// CSV/EXCEL: write a leading row-index column.
    #[serde(default)]
    pub index_rows: bool,
    /// JSON: indentation width; 0 writes compact JSON.
    #[serde(default = "default_indent")]
    pub indent: usize,
}

impl OutputFile {
    /// A headerless output of the given type with default delimiter and indent.
    pub fn new(file_type: FileType) -> Self {
        Self {
            file_type,
            has_header: false,
            line_delimited_json: false,
            sheet_name: None,
            compression: None,
            name: None,
            delimiter: default_delimiter(),
            index_rows: false,
            indent: default_indent(),
        }
    }

    /// Whether to write a header line (or row) before the data.
    pub fn with_header(mut self, has_header: bool) -> Self {
        self.has_header = has_header;
        self
    }

    /// File name to use inside a destination directory, or `None` for in-process output.
    pub fn file_name(&self) -> Option<String> {
        match &self.name {
            Some(name) => Some(name.clone()),
            None => self
                .file_type
                .default_extension()
                .map(|ext| format!("output.{ext}")),
        }
    }

    /// Worksheet name, `Sheet1` when unset.
    pub fn sheet_name(&self) -> &str {
        self.sheet_name.as_deref().unwrap_or("Sheet1")
    }

    /// The delimiter as a byte (validated to be a single byte at load time).
    pub fn delimiter_byte(&self) -> u8 {
        self.delimiter.as_bytes().first().copied().unwrap_or(b',')
    }
}

/// A column of one of the source files.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceField {
    pub name: String,
    /// Unused fields are validated (header/count checks) but never read into batches.
    #[serde(default = "default_true")]
    pub used: bool,
    /// Index into [`Configuration::source_files`].
    pub file_index: usize,
    #[serde(default, rename = "type", deserialize_with = "deserialize_data_type")]
    pub data_type: Option<DataType>,
    /// FWF: `[start, end)` character span.
    #[serde(default, rename = "colSpecs", deserialize_with = "deserialize_span")]
    pub span: Option<(usize, usize)>,
}

impl SourceField {
    /// A used field of file `file_index`.
    pub fn new(name: impl Into<String>, file_index: usize) -> Self {
        Self {
            name: name.into(),
            used: true,
            file_index,
            data_type: None,
            span: None,
        }
    }

    /// Fixed-width character span `[start, end)`.
    pub fn with_span(mut self, start: usize, end: usize) -> Self {
        self.span = Some((start, end));
        self
    }

    /// Mark the field as present in the file but not read.
    pub fn unused(mut self) -> Self {
        self.used = false;
        self
    }

    /// The fixed-width span as a character range.
    pub fn char_range(&self) -> Option<Range<usize>> {
        self.span.map(|(start, end)| start..end)
    }
}

/// A column of the output.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OutputField {
    pub name: String,
    #[serde(rename = "type")]
    pub data_type: DataType,
    /// Indexes into [`Configuration::source_fields`]; more than one means a merge.
    pub source_fields: Vec<usize>,
    /// Separators placed between merged source values (`source_fields.len() - 1` of them).
    #[serde(default)]
    pub merge_delimiters: Vec<String>,
    #[serde(default)]
    pub allow_null: bool,
    #[serde(default)]
    pub replace_null_with: Option<Value>,
    /// Literals that coerce to `true` when a string column is declared BOOLEAN.
    #[serde(
        default = "default_truthy_strings",
        deserialize_with = "deserialize_truthy_strings"
    )]
    pub truthy_strings: Vec<String>,
    #[serde(default)]
    pub transformations: Vec<Transformation>,
    #[serde(default, rename = "colSpecs", deserialize_with = "deserialize_span")]
    pub span: Option<(usize, usize)>,
}

impl OutputField {
    /// A required field fed by the source fields at `source_fields`.
    pub fn new(name: impl Into<String>, data_type: DataType, source_fields: Vec<usize>) -> Self {
        Self {
            name: name.into(),
            data_type,
            source_fields,
            merge_delimiters: Vec::new(),
            allow_null: false,
            replace_null_with: None,
            truthy_strings: default_truthy_strings(),
            transformations: Vec::new(),
            span: None,
        }
    }

    /// Delimiters placed between merged source values; one fewer than the source fields.
    pub fn with_merge_delimiters<I, S>(mut self, delimiters: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.merge_delimiters = delimiters.into_iter().map(Into::into).collect();
        self
    }

    /// Allow nulls, optionally replacing them with `replacement`.
    pub fn nullable(mut self, replacement: Option<Value>) -> Self {
        self.allow_null = true;
        self.replace_null_with = replacement;
        self
    }

    /// Transformation chain, applied in order.
    pub fn with_transformations(mut self, transformations: Vec<Transformation>) -> Self {
        self.transformations = transformations;
        self
    }

    /// Fixed-width output span `[start, end)`.
    pub fn with_span(mut self, start: usize, end: usize) -> Self {
        self.span = Some((start, end));
        self
    }

    /// Value substituted for nulls in a nullable field.
    pub fn null_replacement(&self) -> Value {
        match &self.replace_null_with {
            Some(v) if !v.is_null() => v.clone(),
            _ if self.data_type == DataType::String => Value::Utf8(String::new()),
            _ => Value::Null,
        }
    }

    /// Fixed-width column width.
    pub fn width(&self) -> Option<usize> {
        self.span.map(|(start, end)| end.saturating_sub(start))
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct Template {
    #[serde(default)]
    label: Option<String>,
    #[serde(default)]
    version: Option<String>,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    source_files: Vec<SourceFile>,
    #[serde(default)]
    source_fields: Vec<SourceField>,
    #[serde(default)]
    output_file: Option<OutputFile>,
    #[serde(default)]
    output_fields: Vec<OutputField>,
}

/// A validated configuration template.
#[derive(Debug, Clone)]
pub struct Configuration {
    pub id: String,
    pub label: String,
    pub version: String,
    pub description: String,
    pub source_files: Vec<SourceFile>,
    pub source_fields: Vec<SourceField>,
    pub output_file: OutputFile,
    pub output_fields: Vec<OutputField>,
}

impl Configuration {
    /// Build and validate a configuration from parts.
    pub fn new(
        id: impl Into<String>,
        source_files: Vec<SourceFile>,
        source_fields: Vec<SourceField>,
        output_file: OutputFile,
        output_fields: Vec<OutputField>,
    ) -> EtlResult<Self> {
        let id = id.into();
        validate_id(&id)?;
        let config = Self {
            id,
            label: "No Name".to_string(),
            version: "No Version".to_string(),
            description: String::new(),
            source_files,
            source_fields,
            output_file,
            output_fields,
        };
        config.validate()?;
        Ok(config)
    }

    /// Load a template from a local JSON file.
    pub fn from_path(id: &str, path: impl AsRef<Path>) -> EtlResult<Self> {
        validate_id(id)?;
        let path = path.as_ref();
        if !path.is_file() {
            return Err(EtlError::FileNotFound {
                path: path.to_path_buf(),
            });
        }
        let text = fs::read_to_string(path)?;
        Self::from_json_str(id, &text)
    }

    /// Parse a template from JSON text.
    pub fn from_json_str(id: &str, text: &str) -> EtlResult<Self> {
        validate_id(id)?;
        let template: Template = serde_json::from_str(text)
            .map_err(|e| EtlError::config(format!("could not parse configuration: {e}")))?;
        let output_file = template
            .output_file
            .ok_or_else(|| EtlError::config("There was no output file defined for this configuration."))?;

        let config = Self {
            id: id.to_string(),
            label: template.label.filter(|s| !s.is_empty()).unwrap_or_else(|| "No Name".to_string()),
            version: template
                .version
                .filter(|s| !s.is_empty())
                .unwrap_or_else(|| "No Version".to_string()),
            description: template.description.unwrap_or_default(),
            source_files: template.source_files,
            source_fields: template.source_fields,
            output_file,
            output_fields: template.output_fields,
        };
        config.validate()?;
        Ok(config)
    }

    /// Source fields (with their global index) that belong to file `file_index`.
    pub fn fields_of_file(&self, file_index: usize) -> Vec<(usize, &SourceField)> {
        self.source_fields
            .iter()
            .enumerate()
            .filter(|(_, f)| f.file_index == file_index)
            .collect()
    }

    /// Whether the input can be streamed chunk by chunk (a single CSV or FWF file).
    pub fn can_stream(&self) -> bool {
        self.source_files.len() == 1 && self.source_files[0].file_type.is_streamable()
    }

    /// "Object" for fields fed by a JSON file, "Row" otherwise.
    pub fn location_label(&self, field: &OutputField) -> &'static str {
        let file_type = field
            .source_fields
            .first()
            .and_then(|&idx| self.source_fields.get(idx))
            .and_then(|sf| self.source_files.get(sf.file_index))
            .map(|file| file.file_type);
        match file_type {
            Some(FileType::Json) => "Object",
            _ => "Row",
        }
    }

    fn validate(&self) -> EtlResult<()> {
        if self.source_fields.is_empty() {
            return Err(EtlError::config("There were no source fields defined for this configuration."));
        }
        if self.output_fields.is_empty() {
            return Err(EtlError::config("There were no output fields defined for this configuration."));
        }
        if self.source_files.is_empty() {
            return Err(EtlError::config("There were no source files defined for this configuration."));
        }

        for (idx, file) in self.source_files.iter().enumerate() {
            if file.file_type == FileType::Csv {
                validate_delimiter(&file.delimiter, &format!("source file #{}", idx + 1))?;
            }
        }

        for field in &self.source_fields {
            if field.name.is_empty() {
                return Err(EtlError::config("Each source field must have a name."));
            }
            let file = self.source_files.get(field.file_index).ok_or_else(|| {
                EtlError::config(format!(
                    "Source field '{}' refers to file index {}, but only {} source file(s) are defined.",
                    field.name,
                    field.file_index,
                    self.source_files.len()
                ))
            })?;
            if file.file_type == FileType::Fwf {
                validate_span(field.span, &field.name)?;
            }
        }

        for (i, field) in self.output_fields.iter().enumerate() {
            if field.name.is_empty() {
                return Err(EtlError::config("Each output field must have a name."));
            }
            if self.output_fields[..i].iter().any(|f| f.name == field.name) {
                return Err(EtlError::config(format!(
                    "Output field '{}' is defined more than once.",
                    field.name
                )));
            }
            if field.source_fields.is_empty() {
                return Err(EtlError::config(format!(
                    "Output field '{}' needs at least one source field",
                    field.name
                )));
            }
            if let Some(&bad) = field.source_fields.iter().find(|&&s| s >= self.source_fields.len()) {
                return Err(EtlError::config(format!(
                    "Output field '{}' refers to source field {}, but only {} source field(s) are defined.",
                    field.name,
                    bad,
                    self.source_fields.len()
                )));
            }
            if field.merge_delimiters.len() != field.source_fields.len() - 1 {
                return Err(EtlError::config(format!(
                    "Output field '{}' has the wrong number of merge delimiters; expected {} but got {}",
                    field.name,
                    field.source_fields.len() - 1,
                    field.merge_delimiters.len()
                )));
            }
            if self.output_file.file_type == FileType::Fwf {
                validate_span(field.span, &field.name)?;
            }
        }

        if self.output_file.file_type == FileType::Csv {
            validate_delimiter(&self.output_file.delimiter, "the output file")?;
        }
        match self.output_file.compression.as_deref() {
            None | Some("none") => {}
            Some(other) => {
                return Err(EtlError::config(format!(
                    "{other} is not a supported compression type."
                )));
            }
        }
        Ok(())
    }
}

impl fmt::Display for Configuration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let source_names: Vec<&str> = self.source_fields.iter().map(|s| s.name.as_str()).collect();
        let output_names: Vec<&str> = self.output_fields.iter().map(|s| s.name.as_str()).collect();
        let input_types: Vec<String> = self.source_files.iter().map(|s| s.file_type.to_string()).collect();

        writeln!(f, "*****  Configuration Details *****")?;
        writeln!(f, "Name: {} ({})", self.label, self.version)?;
        writeln!(f, "Description: {}", self.description)?;
        writeln!(f, "Input: {}", input_types.join(", "))?;
        writeln!(f, "{} Expected Fields: {}", source_names.len(), source_names.join(", "))?;
        writeln!(f, "Output: {}", self.output_file.file_type)?;
        write!(f, "{} Output Fields: {}", output_names.len(), output_names.join(", "))
    }
}

fn validate_id(id: &str) -> EtlResult<()> {
    if id.is_empty() {
        return Err(EtlError::config("Configuration Id must be set."));
    }
    if id.chars().count() != CONFIGURATION_ID_LEN {
        return Err(EtlError::config(format!(
            "The configuration Id you supplied ({id}) does not match the expected {CONFIGURATION_ID_LEN} character length."
        )));
    }
    Ok(())
}

fn validate_delimiter(delimiter: &str, owner: &str) -> EtlResult<()> {
    if delimiter.len() != 1 {
        return Err(EtlError::config(format!(
            "The delimiter for {owner} must be a single byte, got '{delimiter}'."
        )));
    }
    Ok(())
}

fn validate_span(span: Option<(usize, usize)>, field: &str) -> EtlResult<()> {
    match span {
        Some((start, end)) if start < end => Ok(()),
        Some((start, end)) => Err(EtlError::config(format!(
            "Field '{field}' has an empty column span [{start}, {end}]."
        ))),
        None => Err(EtlError::config(format!(
            "Field '{field}' does not have column markers set."
        ))),
    }
}

fn default_delimiter() -> String {
    ",".to_string()
}

fn default_indent() -> usize {
    2
}

fn default_true() -> bool {
    true
}

fn default_truthy_strings() -> Vec<String> {
    DEFAULT_TRUTHY_STRINGS.iter().map(|s| (*s).to_string()).collect()
}

fn deserialize_optional_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<String>::deserialize(deserializer)?;
    Ok(raw.filter(|s| !s.is_empty()))
}

fn deserialize_data_type<'de, D>(deserializer: D) -> Result<Option<DataType>, D::Error>
where
    D: Deserializer<'de>,
{
    match deserialize_optional_string(deserializer)? {
        None => Ok(None),
        Some(s) => serde_json::from_value(serde_json::Value::String(s.clone()))
            .map(Some)
            .map_err(|_| serde::de::Error::custom(format!("{s} is not a valid field type"))),
    }
}

fn deserialize_span<'de, D>(deserializer: D) -> Result<Option<(usize, usize)>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<Vec<usize>>::deserialize(deserializer)?.unwrap_or_default();
    match raw.as_slice() {
        [] => Ok(None),
        [start, end] => Ok(Some((*start, *end))),
        other => Err(serde::de::Error::custom(format!(
            "colSpecs must be [start, end], got {other:?}"
        ))),
    }
}

fn deserialize_truthy_strings<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<Vec<String>>::deserialize(deserializer)?.unwrap_or_default();
    if raw.is_empty() {
        Ok(default_truthy_strings())
    } else {
        Ok(raw)
    }
}

#[cfg(test)]
mod tests {
    use super::{Configuration, FileType};
    use crate::error::EtlError;
    use crate::types::{DataType, Value};

    const ID: &str = "fc01da57-106a-4255-be48-3e634296ce3f";

    fn template(output_fields: &str) -> String {
        format!(
            r#"{{
                "label": "people",
                "sourceFiles": [{{"type": "CSV", "hasHeader": true}}],
                "sourceFields": [
                    {{"name": "year", "fileIndex": 0}},
                    {{"name": "month", "fileIndex": 0}},
                    {{"name": "day", "fileIndex": 0, "used": false}}
                ],
                "outputFile": {{"type": "JSON", "indent": 4}},
                "outputFields": {output_fields}
            }}"#
        )
    }

    fn config_error(err: EtlError) -> String {
        match err {
            EtlError::Config { message } => message,
            other => panic!("expected config error, got {other:?}"),
        }
    }

    #[test]
    fn loads_a_full_template() {
        let text = template(
            r#"[
                {"name": "Date", "type": "STRING", "sourceFields": [0, 1], "mergeDelimiters": ["-"]},
                {"name": "Year", "type": "INT", "sourceFields": [0], "allowNull": true, "replaceNullWith": 1970,
                 "transformations": [{"operation": "VALIDATE_BY_RANGE", "parameters": {"min": 1900, "max": 2100, "stopOnInvalid": true}}]}
            ]"#,
        );
        let config = Configuration::from_json_str(ID, &text).unwrap();

        assert_eq!(config.label, "people");
        assert_eq!(config.version, "No Version");
        assert_eq!(config.output_file.file_type, FileType::Json);
        assert_eq!(config.output_file.indent, 4);
        assert_eq!(config.output_file.file_name().as_deref(), Some("output.json"));
        assert!(!config.source_fields[2].used);

        let year = &config.output_fields[1];
        assert_eq!(year.data_type, DataType::Int);
        assert_eq!(year.null_replacement(), Value::Int(1970));
        assert_eq!(year.transformations.len(), 1);
        assert_eq!(year.truthy_strings, vec!["True", "1", "true", "Yes", "yes"]);
        assert!(config.can_stream());
        assert_eq!(config.location_label(year), "Row");
    }

    #[test]
    fn rejects_bad_ids() {
        let text = template(r#"[{"name": "Y", "type": "INT", "sourceFields": [0]}]"#);
        assert!(config_error(Configuration::from_json_str("", &text).unwrap_err()).contains("must be set"));
        assert!(config_error(Configuration::from_json_str("1234234", &text).unwrap_err()).contains("36"));
    }

    #[test]
    fn rejects_delimiter_count_mismatch() {
        let text = template(r#"[{"name": "D", "type": "STRING", "sourceFields": [0, 1]}]"#);
        let msg = config_error(Configuration::from_json_str(ID, &text).unwrap_err());
        assert!(msg.contains("wrong number of merge delimiters"), "{msg}");
    }

    #[test]
    fn rejects_unknown_operation() {
        let text = template(
            r#"[{"name": "Y", "type": "INT", "sourceFields": [0],
                 "transformations": [{"operation": "MODIFY_EXPLODE", "parameters": {}}]}]"#,
        );
        let msg = config_error(Configuration::from_json_str(ID, &text).unwrap_err());
        assert!(msg.contains("MODIFY_EXPLODE"), "{msg}");
    }

    #[test]
    fn rejects_out_of_range_source_reference() {
        let text = template(r#"[{"name": "Y", "type": "INT", "sourceFields": [7]}]"#);
        let msg = config_error(Configuration::from_json_str(ID, &text).unwrap_err());
        assert!(msg.contains("refers to source field 7"), "{msg}");
    }

    #[test]
    fn rejects_missing_output_file() {
        let text = r#"{
            "sourceFiles": [{"type": "CSV"}],
            "sourceFields": [{"name": "a", "fileIndex": 0}],
            "outputFields": [{"name": "A", "type": "STRING", "sourceFields": [0]}]
        }"#;
        let msg = config_error(Configuration::from_json_str(ID, text).unwrap_err());
        assert!(msg.contains("no output file"), "{msg}");
    }

    #[test]
    fn fixed_width_output_requires_spans() {
        let text = r#"{
            "sourceFiles": [{"type": "CSV"}],
            "sourceFields": [{"name": "a", "fileIndex": 0}],
            "outputFile": {"type": "FWF"},
            "outputFields": [{"name": "A", "type": "STRING", "sourceFields": [0], "colSpecs": []}]
        }"#;
        let msg = config_error(Configuration::from_json_str(ID, text).unwrap_err());
        assert!(msg.contains("column markers"), "{msg}");
    }

    #[test]
    fn rejects_compression() {
        let text = r#"{
            "sourceFiles": [{"type": "CSV"}],
            "sourceFields": [{"name": "a", "fileIndex": 0}],
            "outputFile": {"type": "CSV", "compression": "gzip"},
            "outputFields": [{"name": "A", "type": "STRING", "sourceFields": [0]}]
        }"#;
        let msg = config_error(Configuration::from_json_str(ID, text).unwrap_err());
        assert!(msg.contains("gzip"), "{msg}");
    }

    #[test]
    fn missing_template_file_is_not_found() {
        let err = Configuration::from_path(ID, "definitely/not/here.json").unwrap_err();
        assert!(matches!(err, EtlError::FileNotFound { .. }));
    }

    #[test]
    fn summary_lists_fields() {
        let text = template(r#"[{"name": "Year", "type": "INT", "sourceFields": [0]}]"#);
        let config = Configuration::from_json_str(ID, &text).unwrap();
        let summary = config.to_string();
        assert!(summary.contains("3 Expected Fields: year, month, day"));
        assert!(summary.contains("Output: JSON"));
    }
}
