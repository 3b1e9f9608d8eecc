use std::fs;
use std::path::Path;

use crate::error::EtlResult;

/// Default file name of the errors-and-warnings artifact.
pub const DIAGNOSTICS_FILE_NAME: &str = "errors_and_warnings.txt";

/// Run-scoped collector of row-level errors and warnings.
///
/// With a cap of `K`, at most `K` lines (errors and warnings combined) are stored; conditions past
/// the cap are dropped silently and neither counted nor raised.
#[derive(Debug, Clone, Default)]
pub struct Diagnostics {
    errors: Vec<String>,
    warnings: Vec<String>,
    cap: Option<usize>,
}

impl Diagnostics {
    pub fn new(cap: Option<usize>) -> Self {
        Self {
            cap,
            ..Self::default()
        }
    }

    pub fn error(&mut self, message: impl Into<String>) {
        if self.has_room() {
            self.errors.push(message.into());
        }
    }

    pub fn warning(&mut self, message: impl Into<String>) {
        if self.has_room() {
            self.warnings.push(message.into());
        }
    }

    fn has_room(&self) -> bool {
        self.cap
            .is_none_or(|cap| self.errors.len() + self.warnings.len() < cap)
    }

    pub fn errors(&self) -> &[String] {
        &self.errors
    }

    pub fn warnings(&self) -> &[String] {
        &self.warnings
    }

    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    /// Whether nothing was stored.
    pub fn is_empty(&self) -> bool {
        self.errors.is_empty() && self.warnings.is_empty()
    }

    /// The artifact text: an ERRORS section followed by a WARNINGS section, one line each.
    pub fn render(&self) -> String {
        let mut out = String::from("***** ERRORS *****\n");
        for line in &self.errors {
            out.push_str(line);
            out.push('\n');
        }
        out.push_str("\n***** WARNINGS *****\n");
        for line in &self.warnings {
            out.push_str(line);
            out.push('\n');
        }
        out
    }

    /// Write the artifact to `path` if anything was stored. Returns whether a file was written.
    pub fn write_to(&self, path: &Path) -> EtlResult<bool> {
        if self.is_empty() {
            return Ok(false);
        }
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, self.render())?;
        Ok(true)
    }
}
