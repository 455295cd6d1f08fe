//! Atomic file output.
//!
//! Every artifact the pipeline produces is first written to a temporary file
//! in the destination directory and then renamed over the final path. A
//! reader therefore sees either the previous complete file or the new
//! complete file, never a truncated one. The temporary file lives in the
//! same directory so the rename never crosses a filesystem boundary.

use serde::Serialize;
use std::io::{self, Write};
use std::path::Path;
use tempfile::NamedTempFile;

/// Directory a path will be written into; `.` for bare file names.
pub fn parent_dir(path: &Path) -> &Path {
    match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    }
}

/// Create a hidden staging file next to `dest`, creating the directory first.
///
/// The file is deleted when the returned handle is dropped unless it is
/// persisted.
pub fn staging_file(dest: &Path) -> io::Result<NamedTempFile> {
    let dir = parent_dir(dest);
    std::fs::create_dir_all(dir)?;
    tempfile::Builder::new()
        .prefix(".pdf-harvest-")
        .suffix(".part")
        .tempfile_in(dir)
}

/// Write `contents` to `path` atomically, creating parent directories.
pub fn write_atomic(path: &Path, contents: &[u8]) -> io::Result<()> {
    let mut tmp = staging_file(path)?;
    tmp.write_all(contents)?;
    tmp.flush()?;
    tmp.as_file().sync_all()?;
    tmp.persist(path).map_err(|e| e.error)?;
    Ok(())
}

/// Serialise `value` as pretty-printed JSON and write it atomically.
pub fn write_json_atomic<T: Serialize>(path: &Path, value: &T) -> io::Result<()> {
    let json = serde_json::to_vec_pretty(value)
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
    write_atomic(path, &json)
}
