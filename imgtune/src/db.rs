//! Session records, keyed by session identifier

use jsondb::JsonDb;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

pub type UserDb = JsonDb<UserRecord>;

/// Absolute paths of the files owned by one session
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct UserRecord {
    pub original_image: PathBuf,
    pub preview_image: PathBuf,
}

impl UserRecord {
    pub fn new(original_image: impl Into<PathBuf>, preview_image: impl Into<PathBuf>) -> Self {
        Self {
            original_image: original_image.into(),
            preview_image: preview_image.into(),
        }
    }
}
