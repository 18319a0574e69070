//! File system utilities for the shared upload directory.

use anyhow::{Context, Result};
use std::{
    fs, io,
    path::{Path, PathBuf},
};

/// Creates `path` and all of its parents when missing.
///
/// # Examples
///
/// ```no_run
/// use cutil::fs::ensure_dir;
///
/// ensure_dir("/tmp/imgtune/uploads").unwrap();
/// ```
pub fn ensure_dir(path: impl AsRef<Path>) -> Result<()> {
    let path = path.as_ref();
    fs::create_dir_all(path).with_context(|| format!("create dir {} failed", path.display()))
}

/// Removes every regular file in `dir` whose name starts with `prefix`.
///
/// A file that fails to be removed is logged and skipped, the rest of the
/// directory is still processed.
///
/// # Returns
///
/// Returns the paths that were removed.
///
/// # Examples
///
/// ```no_run
/// use cutil::fs::remove_files_with_prefix;
///
/// let removed = remove_files_with_prefix("/tmp/uploads", "5d1c").unwrap();
/// println!("removed {} files", removed.len());
/// ```
pub fn remove_files_with_prefix(dir: impl AsRef<Path>, prefix: &str) -> io::Result<Vec<PathBuf>> {
    let mut removed = vec![];

    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        if !entry.file_type()?.is_file() {
            continue;
        }

        if !entry.file_name().to_string_lossy().starts_with(prefix) {
            continue;
        }

        let path = entry.path();
        match fs::remove_file(&path) {
            Ok(_) => removed.push(path),
            Err(e) => log::warn!("remove {} failed: {e}", path.display()),
        }
    }

    Ok(removed)
}

/// Removes `path` if it is an existing file.
///
/// # Returns
///
/// Returns `true` when a file was removed.
pub fn remove_file_if_exists(path: impl AsRef<Path>) -> io::Result<bool> {
    match fs::remove_file(path) {
        Ok(_) => Ok(true),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
        Err(e) => Err(e),
    }
}

/// Checks if a file exists at the specified path.
///
/// Returns `false` for directories.
pub fn file_exist(path: impl AsRef<Path>) -> bool {
    match fs::metadata(path) {
        Ok(md) => md.is_file(),
        _ => false,
    }
}

/// Returns the lowercased extension of `path` including the leading dot,
/// or an empty string when there is none.
///
/// # Examples
///
/// ```
/// use cutil::fs::dotted_extension;
///
/// assert_eq!(dotted_extension("cat.JPG"), ".jpg");
/// assert_eq!(dotted_extension("Makefile"), "");
/// ```
pub fn dotted_extension(path: impl AsRef<Path>) -> String {
    path.as_ref()
        .extension()
        .map(|ext| format!(".{}", ext.to_string_lossy().to_lowercase()))
        .unwrap_or_default()
}
