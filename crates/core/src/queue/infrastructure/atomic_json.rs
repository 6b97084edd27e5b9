use std::fs;
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::queue::domain::queue_error::QueueError;

/// Staging path next to `path`; never ends in `.json` so scanners skip it.
pub fn staging_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(".tmp");
    path.with_file_name(name)
}

/// Write `value` to a staging file, then rename it over `path`.
///
/// Readers observe either the previous content or the complete new content.
pub fn write_atomic<T: Serialize>(path: &Path, value: &T) -> Result<(), QueueError> {
    let bytes = serde_json::to_vec_pretty(value).map_err(|source| QueueError::Encode {
        path: path.to_path_buf(),
        source,
    })?;
    let staging = staging_path(path);
    fs::write(&staging, bytes).map_err(|e| QueueError::storage(&staging, e))?;
    if let Err(e) = fs::rename(&staging, path) {
        let _ = fs::remove_file(&staging);
        return Err(QueueError::storage(path, e));
    }
    Ok(())
}

/// `None` when the file is missing or does not parse.
pub fn read_json<T: DeserializeOwned>(path: &Path) -> Option<T> {
    let bytes = fs::read(path).ok()?;
    match serde_json::from_slice(&bytes) {
        Ok(value) => Some(value),
        Err(e) => {
            log::debug!("Unreadable record {}: {e}", path.display());
            None
        }
    }
}
