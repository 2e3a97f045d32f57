//! Record file loading utilities
//!
//! Generic helpers for reading record files out of a workspace directory.
//! [`crate::core::store::FileStore`] builds on these.

use serde::de::DeserializeOwned;
use std::fs;
use std::path::{Path, PathBuf};

use crate::core::workspace::RECORD_SUFFIX;
use crate::yaml::{parse_yaml_file, YamlError};

/// Load all records of type T from a directory
///
/// Files that fail to parse are skipped with a warning; `dce validate`
/// reports them in detail.
pub fn load_all<T: DeserializeOwned>(dir: &Path) -> std::io::Result<Vec<(PathBuf, T)>> {
    let mut records = Vec::new();

    for path in record_files(dir)? {
        match parse_yaml_file::<T>(&path) {
            Ok(record) => records.push((path, record)),
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "skipping unreadable record");
            }
        }
    }

    Ok(records)
}

/// List record files in a directory, sorted by name (and therefore by ULID)
pub fn record_files(dir: &Path) -> std::io::Result<Vec<PathBuf>> {
    let mut files = Vec::new();

    if !dir.exists() {
        return Ok(files);
    }

    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_file() && path.to_string_lossy().ends_with(RECORD_SUFFIX) {
            files.push(path);
        }
    }

    files.sort();
    Ok(files)
}

/// Find record files whose id starts with the given (possibly partial) id
pub fn find_entity_files(dir: &Path, id: &str) -> std::io::Result<Vec<PathBuf>> {
    let needle = id.to_uppercase();
    Ok(record_files(dir)?
        .into_iter()
        .filter(|path| {
            path.file_name()
                .map(|n| n.to_string_lossy().to_uppercase().starts_with(&needle))
                .unwrap_or(false)
        })
        .collect())
}

/// Load a single record from a known path
pub fn load_entity<T: DeserializeOwned>(path: &Path) -> Result<T, YamlError> {
    parse_yaml_file(path)
}
