//! Dated, immutable ingestion snapshots.
//!
//! Each ingestion run writes into `<base>/<YYYY-MM-DD>/` and records that id
//! in a `LATEST` pointer file next to the dated directories. Readers resolve
//! the pointer first and fall back to the lexicographically-last directory
//! name, which for ISO dates sorts chronologically.

use chrono::Local;
use log::warn;
use std::path::{Path, PathBuf};
use thiserror::Error;

const LATEST_POINTER: &str = "LATEST";

#[derive(Debug, Error)]
pub enum SnapshotError {
    #[error("No snapshot folders found under '{0}'. Run the matching ingestion first.")]
    NoSnapshots(PathBuf),

    #[error("Failed to create snapshot directory '{0}'")]
    Create(PathBuf, #[source] std::io::Error),

    #[error("Failed to read snapshot base directory '{0}'")]
    ReadBase(PathBuf, #[source] std::io::Error),

    #[error("Failed to write latest-snapshot pointer '{0}'")]
    WritePointer(PathBuf, #[source] std::io::Error),
}

/// Snapshot id for a run started now, e.g. `2024-06-17`.
pub fn today_snapshot_id() -> String {
    Local::now().format("%Y-%m-%d").to_string()
}

/// Creates `<base>/<id>/` and points `LATEST` at it.
pub fn new_snapshot(base: &Path, id: &str) -> Result<PathBuf, SnapshotError> {
    let dir = base.join(id);
    std::fs::create_dir_all(&dir).map_err(|e| SnapshotError::Create(dir.clone(), e))?;
    let pointer = base.join(LATEST_POINTER);
    std::fs::write(&pointer, id).map_err(|e| SnapshotError::WritePointer(pointer, e))?;
    Ok(dir)
}

/// Resolves the most recent snapshot directory under `base`.
pub fn latest_snapshot(base: &Path) -> Result<PathBuf, SnapshotError> {
    let pointer = base.join(LATEST_POINTER);
    if let Ok(id) = std::fs::read_to_string(&pointer) {
        let dir = base.join(id.trim());
        if dir.is_dir() {
            return Ok(dir);
        }
        warn!(
            "LATEST pointer in {} names a missing snapshot '{}', falling back to directory scan",
            base.display(),
            id.trim()
        );
    }

    let entries = std::fs::read_dir(base)
        .map_err(|e| SnapshotError::ReadBase(base.to_path_buf(), e))?;
    let mut dated: Vec<PathBuf> = entries
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| path.is_dir())
        .collect();
    dated.sort();
    dated
        .pop()
        .ok_or_else(|| SnapshotError::NoSnapshots(base.to_path_buf()))
}
