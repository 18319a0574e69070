use crate::{
    error::{AppError, AppResult},
    server::AppState,
    session::CurrentUser,
    storage::Storage,
};
use axum::{
    body::Body,
    extract::{Query, State},
    http::header,
    response::{IntoResponse, Response},
};
use futures::StreamExt;
use image_effect::{OutputFormat, TransformParams};
use std::{collections::HashMap, path::PathBuf};
use tokio_util::io::ReaderStream;

const DOWNLOAD_FAILED: &str = "Error processing the image.";
const DOWNLOAD_FORMATS: [&str; 3] = ["jpeg", "png", "jpg"];
const NONCE_LEN: usize = 8;

/// Deletes the file once dropped
#[derive(Debug)]
struct TempFile(PathBuf);

impl Drop for TempFile {
    fn drop(&mut self) {
        match cutil::fs::remove_file_if_exists(&self.0) {
            Ok(true) => log::debug!("removed {}", self.0.display()),
            Ok(false) => (),
            Err(e) => log::warn!("remove {} failed: {e}", self.0.display()),
        }
    }
}

/// Format from the allow-list, `jpeg` for anything else
pub fn download_format(query: &HashMap<String, String>) -> &str {
    query
        .get("format")
        .map(String::as_str)
        .filter(|format| DOWNLOAD_FORMATS.contains(format))
        .unwrap_or("jpeg")
}

// A missing value is `default`, a value that is not a number is NaN and
// gets rejected by the effects
fn number(query: &HashMap<String, String>, key: &str, default: f32) -> f32 {
    query
        .get(key)
        .map_or(default, |value| value.trim().parse().unwrap_or(f32::NAN))
}

pub fn download_params(query: &HashMap<String, String>, format: OutputFormat) -> TransformParams {
    TransformParams::new()
        .with_brightness(number(query, "brightness", 1.0))
        .with_hue(number(query, "hue", 0.0))
        .with_saturation(number(query, "saturation", 1.0))
        .with_rotation(number(query, "rotation", 0.0))
        .with_format(format)
}

pub async fn download(
    State(state): State<AppState>,
    CurrentUser(user_id): CurrentUser,
    Query(query): Query<HashMap<String, String>>,
) -> AppResult<Response> {
    let record = state
        .db()
        .select(&user_id)
        .await?
        .ok_or_else(|| AppError::not_found("Image not found."))?;

    if !cutil::fs::file_exist(&record.original_image) {
        log::warn!("{user_id} original {} is gone", record.original_image.display());
        return Err(AppError::not_found("File not found."));
    }

    let extension = download_format(&query).to_string();
    let format =
        OutputFormat::from_name(&extension).map_err(|e| AppError::internal(DOWNLOAD_FAILED, e))?;
    let params = download_params(&query, format);

    let ts = cutil::time::timestamp_millis();
    let nonce = cutil::str::random_string(NONCE_LEN);
    let temp_file = TempFile(
        state
            .storage()
            .path(&Storage::download_temp_name(ts, &nonce, &extension)),
    );

    let (input, output) = (record.original_image, temp_file.0.clone());
    let (width, height) =
        tokio::task::spawn_blocking(move || image_effect::process_file(&input, &output, &params))
            .await?
            .map_err(|e| AppError::internal(DOWNLOAD_FAILED, e))?;

    let file = tokio::fs::File::open(&temp_file.0)
        .await
        .map_err(|e| AppError::internal(DOWNLOAD_FAILED, e))?;
    let length = file
        .metadata()
        .await
        .map_err(|e| AppError::internal(DOWNLOAD_FAILED, e))?
        .len();

    log::info!(
        "{user_id} download {} {width}x{height} {length} bytes",
        temp_file.0.display()
    );

    // The stream owns the temp file, it goes away with the body
    let stream = ReaderStream::new(file).map(move |chunk| {
        let _keep = &temp_file;
        chunk
    });

    let attachment = Storage::download_attachment_name(ts, &extension);
    Ok((
        [
            (header::CONTENT_TYPE, format.mime_type().to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{attachment}\""),
            ),
            (header::CONTENT_LENGTH, length.to_string()),
        ],
        Body::from_stream(stream),
    )
        .into_response())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn query(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_download_format_allow_list() {
        assert_eq!(download_format(&query(&[])), "jpeg");
        assert_eq!(download_format(&query(&[("format", "png")])), "png");
        assert_eq!(download_format(&query(&[("format", "jpg")])), "jpg");
        assert_eq!(download_format(&query(&[("format", "bmp")])), "jpeg");
        assert_eq!(download_format(&query(&[("format", "PNG")])), "jpeg");
    }

    #[test]
    fn test_params_defaults_for_missing_values() {
        let params = download_params(&query(&[("hue", " 30 ")]), OutputFormat::Png);
        assert_eq!(params.brightness, 1.0);
        assert_eq!(params.hue, 30.0);
        assert_eq!(params.saturation, 1.0);
        assert_eq!(params.rotation, 0.0);
        assert_eq!(params.format, OutputFormat::Png);
        assert_eq!(params.resize, None);
    }

    #[test]
    fn test_params_garbage_values_are_nan() {
        let params = download_params(
            &query(&[("brightness", "abc"), ("saturation", ""), ("rotation", "-90")]),
            OutputFormat::Jpeg,
        );
        assert!(params.brightness.is_nan());
        assert!(params.saturation.is_nan());
        assert_eq!(params.rotation, -90.0);
    }

    #[test]
    fn test_temp_file_removed_on_drop() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("processed-1-abc.png");
        std::fs::write(&path, b"x").unwrap();

        drop(TempFile(path.clone()));
        assert!(!path.exists());

        // already gone is fine
        drop(TempFile(path));
    }
}
