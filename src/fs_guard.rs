//! Filesystem checks used before and during fetching

use crate::error::{Error, Result};
use std::path::Path;

/// Returns true if a regular file of at least `min_size` bytes exists at `path`
///
/// This is the dedup-by-existence signal: such a file is treated as the result of a
/// prior successful fetch.
#[must_use]
pub fn has_valid_file(path: &Path, min_size: u64) -> bool {
    match std::fs::metadata(path) {
        Ok(meta) => meta.is_file() && meta.len() >= min_size,
        Err(_) => false,
    }
}

/// Make sure `path` is a directory, creating it (and its parents) if needed
///
/// # Errors
///
/// Returns [`Error::NotADirectory`] if something other than a directory already
/// occupies `path`, or an I/O error if creation fails.
pub fn ensure_dir(path: &Path) -> Result<()> {
    match std::fs::metadata(path) {
        Ok(meta) if meta.is_dir() => Ok(()),
        Ok(_) => Err(Error::NotADirectory(path.to_path_buf())),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            std::fs::create_dir_all(path)?;
            tracing::debug!(path = %path.display(), "Created download directory");
            Ok(())
        }
        Err(e) => Err(Error::Io(e)),
    }
}
