//! Handler for staging uploaded images (init frames for image-to-clip).

use axum::extract::{Multipart, State};
use axum::Json;
use serde::Serialize;

use crate::error::{AppError, AppResult};
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct UploadResponse {
    /// Filesystem path the clip endpoint accepts as `image_path`.
    pub path: String,
    /// Retrievable URL of the staged file.
    pub url: String,
}

/// POST /api/upload-image
///
/// Accepts a multipart upload and stages the first file field in the
/// output directory under a sanitized unique name.
pub async fn upload_image(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> AppResult<Json<UploadResponse>> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::BadRequest(e.to_string()))?
    {
        let Some(filename) = field.file_name().map(str::to_string) else {
            continue;
        };

        let bytes = field
            .bytes()
            .await
            .map_err(|e| AppError::BadRequest(e.to_string()))?;

        let stored = state.service.store_upload(&filename, &bytes).await?;
        tracing::info!(filename = %stored.filename, size = bytes.len(), "Upload staged");

        return Ok(Json(UploadResponse {
            path: stored.path.to_string_lossy().into_owned(),
            url: stored.url,
        }));
    }

    Err(AppError::BadRequest(
        "Multipart body must contain a file field".to_string(),
    ))
}
