//! JSON file helpers shared by the training store and the dataset job.

use std::fs::{self, File};
use std::io::Write;
use std::path::Path;

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::CoreError;

/// Read and deserialize a JSON file.
pub fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T, CoreError> {
    let raw = fs::read_to_string(path).map_err(|e| match e.kind() {
        std::io::ErrorKind::NotFound => CoreError::not_found(path),
        _ => CoreError::Io(e),
    })?;
    Ok(serde_json::from_str(&raw)?)
}

/// Write JSON atomically using write-to-temp-then-rename.
pub fn write_json_atomic<T: Serialize>(path: &Path, data: &T) -> Result<(), CoreError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }

    let json = serde_json::to_string_pretty(data)?;
    let temp_path = path.with_extension("json.tmp");

    let mut temp_file = File::create(&temp_path)?;
    temp_file.write_all(json.as_bytes())?;
    temp_file.sync_all()?;

    fs::rename(&temp_path, path)?;
    Ok(())
}
