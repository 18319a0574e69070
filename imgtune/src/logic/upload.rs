use super::PreviewResponse;
use crate::{
    db::UserRecord,
    error::{AppError, AppResult},
    server::AppState,
    session::CurrentUser,
    storage::Storage,
};
use axum::{
    Json,
    body::Bytes,
    extract::{Multipart, State},
};
use image::RgbaImage;
use image_effect::{ImageEffectResult, OutputFormat, TransformParams};

const IMAGE_FIELD: &str = "image";
const ALLOWED_TYPES: [&str; 3] = ["jpeg", "jpg", "png"];

struct UploadedFile {
    file_name: String,
    data: Bytes,
}

/// Both the MIME type and the file extension must name jpeg, jpg or png
pub fn is_allowed_image(file_name: &str, mime_type: &str) -> bool {
    let matches = |s: &str| ALLOWED_TYPES.iter().any(|t| s.contains(t));
    matches(&cutil::fs::dotted_extension(file_name)) && matches(mime_type)
}

pub async fn upload(
    State(state): State<AppState>,
    CurrentUser(user_id): CurrentUser,
    mut multipart: Multipart,
) -> AppResult<Json<PreviewResponse>> {
    let file = read_image_field(&mut multipart)
        .await?
        .ok_or_else(|| AppError::bad_request("No file uploaded."))?;

    let extension = cutil::fs::dotted_extension(&file.file_name);
    let storage = state.storage().clone();
    let original_path = storage.path(&Storage::original_name(&user_id, &extension));
    let preview_name = Storage::preview_name(&user_id, &extension);
    let preview_path = storage.path(&preview_name);

    // Nothing on disk changes until the upload is known to decode
    let (data, output) = (file.data.clone(), preview_path.clone());
    let (image, format) =
        tokio::task::spawn_blocking(move || -> ImageEffectResult<(RgbaImage, OutputFormat)> {
            Ok((
                image_effect::decode_rgba(&data)?,
                OutputFormat::from_path(&output)?,
            ))
        })
        .await?
        .map_err(|e| {
            log::warn!("{user_id} uploaded an unreadable image {}: {e}", file.file_name);
            AppError::bad_request("Uploaded file is not a valid image.")
        })?;

    let uid = user_id.clone();
    tokio::task::spawn_blocking(move || storage.clear_session_files(&uid))
        .await?
        .map_err(|e| AppError::internal("Error saving the image.", e))?;

    tokio::fs::write(&original_path, &file.data)
        .await
        .map_err(|e| AppError::internal("Error saving the image.", e))?;

    log::info!(
        "{user_id} uploaded {} ({} bytes) -> {}",
        file.file_name,
        file.data.len(),
        original_path.display()
    );

    let params = TransformParams::new()
        .with_format(format)
        .with_resize(Some((
            state.config().preview_width,
            state.config().preview_height,
        )));
    let output = preview_path.clone();
    let preview = tokio::task::spawn_blocking(move || {
        image_effect::process_image(image, &output, &params)
    })
    .await?;

    if let Err(e) = preview {
        if let Err(remove_err) = cutil::fs::remove_file_if_exists(&original_path) {
            log::warn!("remove {} failed: {remove_err}", original_path.display());
        }
        return Err(AppError::internal("Image processing failed.", e));
    }

    state
        .db()
        .upsert(&user_id, |_| UserRecord::new(original_path, preview_path))
        .await?;

    Ok(Json(PreviewResponse::new(
        "image added to server temporarily",
        &preview_name,
    )))
}

async fn read_image_field(multipart: &mut Multipart) -> AppResult<Option<UploadedFile>> {
    while let Some(field) = multipart.next_field().await? {
        if field.name() != Some(IMAGE_FIELD) {
            continue;
        }

        let Some(file_name) = field
            .file_name()
            .filter(|name| !name.is_empty())
            .map(str::to_string)
        else {
            continue;
        };

        let mime_type = field.content_type().unwrap_or_default().to_string();
        if !is_allowed_image(&file_name, &mime_type) {
            log::warn!("rejected upload {file_name} ({mime_type})");
            return Err(AppError::bad_request(
                "Only jpeg|jpg|png images are allowed!",
            ));
        }

        let data = field.bytes().await?;
        return Ok(Some(UploadedFile { file_name, data }));
    }

    Ok(None)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_allowed_image() {
        assert!(is_allowed_image("cat.png", "image/png"));
        assert!(is_allowed_image("cat.JPG", "image/jpeg"));
        assert!(is_allowed_image("cat.jpeg", "image/jpeg"));

        assert!(!is_allowed_image("cat.gif", "image/gif"));
        assert!(!is_allowed_image("cat.png", "text/plain"));
        assert!(!is_allowed_image("notes.txt", "image/png"));
        assert!(!is_allowed_image("png", "image/png"));
    }
}
