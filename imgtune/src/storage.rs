//! File naming inside the shared upload directory
//!
//! Session files are prefixed with the session identifier so one upload can
//! wipe everything the session produced before.

use std::{
    io,
    path::{Path, PathBuf},
};

#[derive(Debug, Clone)]
pub struct Storage {
    upload_dir: PathBuf,
}

impl Storage {
    pub fn new(upload_dir: impl Into<PathBuf>) -> Self {
        Self {
            upload_dir: upload_dir.into(),
        }
    }

    pub fn upload_dir(&self) -> &Path {
        &self.upload_dir
    }

    pub fn path(&self, file_name: &str) -> PathBuf {
        self.upload_dir.join(file_name)
    }

    /// `<id>-image.<ext>`
    pub fn original_name(user_id: &str, extension: &str) -> String {
        format!("{user_id}-{}", stored_name(extension))
    }

    /// `<id>-preview-image.<ext>`
    pub fn preview_name(user_id: &str, extension: &str) -> String {
        format!("{user_id}-preview-{}", stored_name(extension))
    }

    /// `<id>_processedImage.<format>`
    pub fn processed_name(user_id: &str, format: &str) -> String {
        format!("{user_id}_processedImage.{format}")
    }

    /// `processed-<ts>-<nonce>.<ext>`, not tied to a session
    pub fn download_temp_name(timestamp: i64, nonce: &str, extension: &str) -> String {
        format!("processed-{timestamp}-{nonce}.{extension}")
    }

    /// Name offered to the browser for a download
    pub fn download_attachment_name(timestamp: i64, extension: &str) -> String {
        format!("processed-{timestamp}.{extension}")
    }

    /// Remove every file the session owns.
    pub fn clear_session_files(&self, user_id: &str) -> io::Result<Vec<PathBuf>> {
        let removed = cutil::fs::remove_files_with_prefix(&self.upload_dir, user_id)?;
        for path in removed.iter() {
            log::debug!("removed {}", path.display());
        }
        Ok(removed)
    }
}

// The client file name only contributes its extension
fn stored_name(extension: &str) -> String {
    format!("image{extension}")
}
