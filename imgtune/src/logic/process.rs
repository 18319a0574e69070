use super::PreviewResponse;
use crate::{
    db::UserRecord,
    error::{AppError, AppResult},
    server::AppState,
    session::CurrentUser,
    storage::Storage,
};
use axum::{Json, body::Bytes, extract::State};
use image_effect::{ImageEffectResult, OutputFormat, TransformParams};
use serde::Deserialize;
use serde_json::Value;

const PROCESS_FAILED: &str = "Image processing failed.";

/// Numbers may be sent as JSON numbers or numeric strings
#[derive(Deserialize, Debug, Default)]
#[serde(default)]
pub struct ProcessRequest {
    pub brightness: Option<Value>,
    pub hue: Option<Value>,
    pub saturation: Option<Value>,
    pub rotation: Option<Value>,
    pub format: Option<String>,
}

impl ProcessRequest {
    /// An empty body is the same as `{}`.
    pub fn from_body(body: &[u8]) -> AppResult<Self> {
        if body.iter().all(u8::is_ascii_whitespace) {
            return Ok(Self::default());
        }

        serde_json::from_slice(body).map_err(|e| {
            log::warn!("invalid process body: {e}");
            AppError::bad_request("Invalid JSON body.")
        })
    }

    pub fn format_name(&self) -> String {
        self.format
            .as_deref()
            .unwrap_or("jpeg")
            .trim()
            .to_ascii_lowercase()
    }

    pub fn params(&self, format: OutputFormat) -> TransformParams {
        TransformParams::new()
            .with_brightness(number(self.brightness.as_ref(), 1.0))
            .with_hue(number(self.hue.as_ref(), 0.0))
            .with_saturation(number(self.saturation.as_ref(), 1.0))
            .with_rotation(number(self.rotation.as_ref(), 0.0))
            .with_format(format)
    }
}

// Anything that is neither a number nor a numeric string is NaN and gets
// rejected by the effects
fn number(value: Option<&Value>, default: f32) -> f32 {
    match value {
        None | Some(Value::Null) => default,
        Some(Value::Number(n)) => n.as_f64().map_or(f32::NAN, |n| n as f32),
        Some(Value::String(s)) => s.trim().parse().unwrap_or(f32::NAN),
        Some(_) => f32::NAN,
    }
}

pub async fn process(
    State(state): State<AppState>,
    CurrentUser(user_id): CurrentUser,
    body: Bytes,
) -> AppResult<Json<PreviewResponse>> {
    let request = ProcessRequest::from_body(&body)?;

    let record = state
        .db()
        .select(&user_id)
        .await?
        .ok_or_else(|| AppError::bad_request("No image found for the user."))?;

    let format_name = request.format_name();
    let format =
        OutputFormat::from_name(&format_name).map_err(|e| AppError::internal(PROCESS_FAILED, e))?;

    let params = request.params(format).with_resize(Some((
        state.config().preview_width,
        state.config().preview_height,
    )));

    let processed_name = Storage::processed_name(&user_id, &format_name);
    let processed_path = state.storage().path(&processed_name);

    let (input, output) = (record.original_image.clone(), processed_path.clone());
    let (width, height) = tokio::task::spawn_blocking(move || -> ImageEffectResult<(u32, u32)> {
        cutil::fs::remove_file_if_exists(&output)?;
        image_effect::process_file(&input, &output, &params)
    })
    .await?
    .map_err(|e| AppError::internal(PROCESS_FAILED, e))?;

    log::info!("{user_id} processed {processed_name} {width}x{height}");

    state
        .db()
        .upsert(&user_id, |old| UserRecord {
            preview_image: processed_path,
            ..old.unwrap_or(record)
        })
        .await?;

    Ok(Json(PreviewResponse::new(
        "Image processed successfully",
        &processed_name,
    )))
}
