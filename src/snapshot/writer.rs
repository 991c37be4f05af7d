use std::ffi::OsString;
use std::path::{Path, PathBuf};

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tokio::fs;

use super::error::WriteError;

/// On-disk cache artifact: `{"meta": {"lastModified": <ms>}, "data": ...}`.
#[derive(Debug, Serialize, Deserialize)]
pub struct Snapshot<T> {
    pub meta: SnapshotMeta,
    pub data: T,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SnapshotMeta {
    /// Build timestamp, epoch milliseconds.
    pub last_modified: i64,
}

/// Sibling temp path the snapshot is staged in before the rename.
fn part_path(path: &Path) -> Result<PathBuf, WriteError> {
    let file_name = path.file_name().ok_or_else(|| WriteError::Io {
        path: path.to_path_buf(),
        source: std::io::Error::new(std::io::ErrorKind::InvalidInput, "path has no file name"),
    })?;
    let mut part: OsString = file_name.to_os_string();
    part.push(".part");
    Ok(path.with_file_name(part))
}

/// Serialize `data` with a fresh timestamp and atomically replace `path`.
///
/// The JSON is written to `<path>.part` and renamed over the destination, so
/// readers see either the previous snapshot or the new one, never a partial
/// file.
pub async fn write_snapshot<T: Serialize>(
    path: &Path,
    data: &T,
) -> Result<SnapshotMeta, WriteError> {
    let meta = SnapshotMeta {
        last_modified: Utc::now().timestamp_millis(),
    };
    let json = serde_json::to_string_pretty(&Snapshot { meta, data })?;

    let io_err = |source| WriteError::Io {
        path: path.to_path_buf(),
        source,
    };

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).await.map_err(io_err)?;
    }

    let part = part_path(path)?;
    if let Err(e) = fs::write(&part, json).await {
        let _ = fs::remove_file(&part).await;
        return Err(io_err(e));
    }
    if let Err(e) = fs::rename(&part, path).await {
        let _ = fs::remove_file(&part).await;
        return Err(io_err(e));
    }

    tracing::debug!("Wrote snapshot to {}", path.display());
    Ok(meta)
}
