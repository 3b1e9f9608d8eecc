//! Local path handling for sources, outputs and the diagnostics artifact.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use tracing::warn;

use crate::error::{EtlError, EtlResult};

/// Sources above this size are logged as a warning when no hard limit is configured.
pub const LARGE_FILE_WARNING_BYTES: u64 = 1024 * 1024 * 1024;

/// Object-storage URIs are recognised only so they can be rejected with a clear message.
pub fn is_object_storage(path: &Path) -> bool {
    path.to_str().is_some_and(|s| s.starts_with("s3://"))
}

/// Resolve a destination path.
///
/// A path without an extension is treated as a directory: it is created and `default_name` is
/// joined onto it. Otherwise the parent directory is created if missing.
pub fn resolve_destination(path: &Path, default_name: &str) -> EtlResult<PathBuf> {
    if is_object_storage(path) {
        return Err(EtlError::config(format!(
            "object storage destinations are not supported: {}",
            path.display()
        )));
    }
    if path.extension().is_none() {
        fs::create_dir_all(path)?;
        return Ok(path.join(default_name));
    }
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    Ok(path.to_path_buf())
}

/// Delete a previous artifact at `path`, if any.
pub fn remove_existing(path: &Path) -> EtlResult<()> {
    match fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e.into()),
    }
}

/// Check that a source exists and respects the size limit.
///
/// With no limit, files larger than [`LARGE_FILE_WARNING_BYTES`] are logged and accepted.
pub fn check_source(path: &Path, max_bytes: Option<u64>) -> EtlResult<()> {
    if is_object_storage(path) {
        return Err(EtlError::config(format!(
            "object storage sources are not supported: {}",
            path.display()
        )));
    }
    let metadata = fs::metadata(path).map_err(|e| {
        if e.kind() == ErrorKind::NotFound {
            EtlError::FileNotFound {
                path: path.to_path_buf(),
            }
        } else {
            EtlError::Io(e)
        }
    })?;
    if !metadata.is_file() {
        return Err(EtlError::FileNotFound {
            path: path.to_path_buf(),
        });
    }

    let size = metadata.len();
    match max_bytes {
        Some(max_size) if size > max_size => Err(EtlError::FileTooLarge {
            path: path.to_path_buf(),
            size,
            max_size,
        }),
        None if size > LARGE_FILE_WARNING_BYTES => {
            warn!(path = %path.display(), size, "source file is larger than 1 GiB");
            Ok(())
        }
        _ => Ok(()),
    }
}
