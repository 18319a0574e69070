//! Request handlers
//!
//! Every handler needs a session (`CurrentUser`) and answers with either a
//! JSON `PreviewResponse`, a file stream or a plain text `AppError`.

mod download;
mod process;
mod upload;

pub use download::download;
pub use process::process;
pub use upload::{is_allowed_image, upload};

use serde::Serialize;

/// Body of a successful upload or process call
#[derive(Serialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct PreviewResponse {
    pub error: bool,
    pub message: String,

    /// File name under `/uploads/`, with a cache busting query
    pub preview_path: String,
}

impl PreviewResponse {
    pub fn new(message: impl Into<String>, file_name: &str) -> Self {
        Self {
            error: false,
            message: message.into(),
            preview_path: format!("{file_name}?t={}", cutil::time::timestamp_millis()),
        }
    }
}
