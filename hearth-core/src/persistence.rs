//! JSON file persistence shared by the memory and social stores.
//!
//! Each store is written as a single JSON document. Writes go to a sibling
//! temporary file first and are then renamed over the target, so a crash
//! mid-save leaves the previous file intact.
//!
//! A missing file reads as `None`. A file that exists but does not decode is
//! a [`HearthError::Validation`] error: callers must not start empty on
//! top of corrupt state.

use std::path::{Path, PathBuf};
use std::time::Instant;

use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::error::{HearthError, Result};

/// Encode `value` as JSON and atomically replace the file at `path`.
///
/// Parent directories are created as needed. Returns the number of bytes
/// written.
///
/// # Errors
///
/// Returns [`HearthError::Serialization`] if encoding fails, or
/// [`HearthError::Storage`] on I/O failure.
pub fn write_json_atomic<T: Serialize>(path: &Path, value: &T, pretty: bool) -> Result<usize> {
    let start = Instant::now();

    let bytes = if pretty {
        serde_json::to_vec_pretty(value)
    } else {
        serde_json::to_vec(value)
    }
    .map_err(|e| HearthError::Serialization(e.to_string()))?;

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|e| HearthError::storage(parent, e))?;
    }

    let tmp = temp_path(path);
    std::fs::write(&tmp, &bytes).map_err(|e| HearthError::storage(&tmp, e))?;
    std::fs::rename(&tmp, path).map_err(|e| HearthError::storage(path, e))?;

    debug!(
        path = %path.display(),
        bytes = bytes.len(),
        elapsed_us = start.elapsed().as_micros(),
        "Wrote JSON state"
    );

    Ok(bytes.len())
}

/// Read and decode the JSON file at `path`.
///
/// Returns `Ok(None)` if the file does not exist.
///
/// # Errors
///
/// Returns [`HearthError::Storage`] if the file exists but cannot be read,
/// or [`HearthError::Validation`] if its contents do not decode.
pub fn read_json<T: DeserializeOwned>(path: &Path) -> Result<Option<T>> {
    let data = match std::fs::read(path) {
        Ok(data) => data,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(HearthError::storage(path, e)),
    };

    let value = serde_json::from_slice(&data).map_err(|e| {
        HearthError::Validation(format!("malformed state file {}: {e}", path.display()))
    })?;

    Ok(Some(value))
}

/// Sibling path used for the write-then-rename step.
fn temp_path(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(std::ffi::OsStr::to_os_string)
        .unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}
