use axum::{
    extract::{Path, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
};

use crate::error::{AppError, Result};
use crate::state::AppState;

pub(crate) async fn get_blob(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> Result<Response> {
    if catalog_db::blob::validate_key(&key).is_err() {
        return Err(AppError::NotFound("Invalid blob key".to_string()));
    }

    let bytes = state
        .blobs
        .get(&key)
        .await
        .map_err(AppError::blob)?
        .ok_or_else(|| AppError::NotFound("Blob not found".to_string()))?;

    let content_type = image::guess_format(&bytes)
        .map(|format| format.to_mime_type())
        .unwrap_or("application/octet-stream");

    Ok((StatusCode::OK, [(header::CONTENT_TYPE, content_type)], bytes).into_response())
}
