//! Disk persistence for the store document.

use crate::error::StoreError;
use crate::store::document::StoreDocument;
use chrono::{DateTime, Utc};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Result of reading the backing file.
#[derive(Debug)]
pub enum Loaded {
    /// No file at the expected location.
    Missing,
    /// File parsed; `migrated` means it must be written back.
    Document { document: StoreDocument, migrated: bool },
    /// File exists but is not a usable document.
    Unusable,
}

/// Read and validate the document at `path`.
pub fn load_document(path: &Path, now: DateTime<Utc>) -> Result<Loaded, StoreError> {
    let bytes = match fs::read(path) {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Loaded::Missing),
        Err(e) => return Err(StoreError::IoError(e)),
    };

    let value: serde_json::Value = match serde_json::from_slice(&bytes) {
        Ok(value) => value,
        Err(e) => {
            warn!(path = %path.display(), error = %e, "Comment store is not valid JSON");
            return Ok(Loaded::Unusable);
        }
    };

    match StoreDocument::from_value(value, now) {
        Some((document, migrated)) => {
            debug!(
                path = %path.display(),
                files = document.metadata.total_files,
                migrated,
                "Loaded comment store"
            );
            Ok(Loaded::Document { document, migrated })
        }
        None => {
            warn!(path = %path.display(), "Comment store has an unexpected structure");
            Ok(Loaded::Unusable)
        }
    }
}

/// Write the whole document to `path` atomically (temp file + rename).
pub fn save_document(path: &Path, document: &StoreDocument) -> Result<(), StoreError> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }

    let bytes = serde_json::to_vec_pretty(document)?;
    let temp_path = temp_path_for(path);
    fs::write(&temp_path, &bytes)?;
    if let Err(e) = fs::rename(&temp_path, path) {
        let _ = fs::remove_file(&temp_path);
        return Err(StoreError::IoError(e));
    }
    Ok(())
}

/// Size of the backing file in bytes, or 0 when it cannot be read.
pub fn file_size(path: &Path) -> u64 {
    fs::metadata(path).map(|m| m.len()).unwrap_or(0)
}

fn temp_path_for(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}
