use axum::{
    extract::{DefaultBodyLimit, Multipart, State},
    routing::post,
    Json, Router,
};
use tracing::{info, instrument, warn};

use super::services::{upload_image, UploadedImage};
use crate::{
    error::{AppError, Result},
    state::AppState,
};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/images", post(upload))
        .layer(DefaultBodyLimit::max(10 * 1024 * 1024)) // 10MB
}

/// POST /images (multipart, field `file`)
#[instrument(skip(state, mp))]
pub async fn upload(State(state): State<AppState>, mut mp: Multipart) -> Result<Json<UploadedImage>> {
    let storage = state.storage.clone().ok_or(AppError::StorageDisabled)?;

    while let Some(field) = mp
        .next_field()
        .await
        .map_err(|e| AppError::Validation(format!("invalid multipart body: {e}")))?
    {
        if field.name() != Some("file") {
            continue;
        }
        let content_type = field
            .content_type()
            .map(|s| s.to_string())
            .unwrap_or_else(|| "application/octet-stream".into());
        let data = field
            .bytes()
            .await
            .map_err(|e| AppError::Validation(format!("invalid multipart body: {e}")))?;
        if data.is_empty() {
            return Err(AppError::Validation("file is empty".into()));
        }

        let img = upload_image(storage.as_ref(), data, &content_type).await?;
        info!(key = %img.key, "image uploaded");
        return Ok(Json(img));
    }

    warn!("upload without file field");
    Err(AppError::Validation("file is required".into()))
}
