use axum::{
    body::Bytes,
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Path, Query, State,
    },
    Json,
};
use catalog_db::blob::playlist_cover_key;
use chrono::Utc;
use models::{Playlist, PlaylistEdit, User};
use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};
use crate::routes::responses::{suggestions, SuggestQuery, Suggestion, VersionedResponse};
use crate::routes::{ensure_fresh, load};
use crate::state::AppState;

pub(crate) const MAX_COVER_BYTES: usize = 10 * 1024 * 1024;

#[derive(Debug, Deserialize)]
pub struct UpdatePlaylistRequest {
    #[serde(flatten)]
    edit: PlaylistEdit,
    #[serde(default)]
    expected_version: Option<i64>,
}

#[derive(Debug, Default, Deserialize)]
pub struct VersionQuery {
    #[serde(default)]
    expected_version: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct DeletedPlaylist {
    playlist_id: String,
    version: i64,
}

/// Song picker of the playlist editor, over the user's own library.
pub async fn suggest_library_songs(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
    query: std::result::Result<Query<SuggestQuery>, QueryRejection>,
) -> Result<Json<Vec<Suggestion>>> {
    let Query(params) = query?;
    let current = load::<User>(&state, &user_id).await?;
    let ranked = current.doc.suggest_library_songs(&params.q);

    Ok(Json(suggestions(ranked)))
}

pub async fn get_playlist(
    State(state): State<AppState>,
    Path((user_id, playlist_id)): Path<(String, String)>,
) -> Result<Json<VersionedResponse<Playlist>>> {
    let current = load::<User>(&state, &user_id).await?;
    let playlist = current
        .doc
        .playlist(&playlist_id)
        .cloned()
        .ok_or_else(|| AppError::NotFound(format!("playlist not found: {playlist_id}")))?;

    Ok(Json(VersionedResponse {
        id: user_id,
        version: current.version,
        data: playlist,
    }))
}

pub async fn update_playlist(
    State(state): State<AppState>,
    Path((user_id, playlist_id)): Path<(String, String)>,
    payload: std::result::Result<Json<UpdatePlaylistRequest>, JsonRejection>,
) -> Result<Json<VersionedResponse<Playlist>>> {
    let Json(req) = payload?;
    let current = load::<User>(&state, &user_id).await?;
    ensure_fresh(&current, req.expected_version)?;

    let now = Utc::now();
    let mut user = current.doc;
    let playlist = user.update_playlist(&playlist_id, req.edit, now)?.clone();

    let version = catalog_db::replace_document(
        &state.db_pool,
        &user_id,
        &user,
        current.version,
        now.timestamp_millis(),
    )
    .await?;

    tracing::info!(
        "users/{} playlist {} updated ({} songs), document at version {}",
        user_id,
        playlist_id,
        playlist.songs.len(),
        version
    );

    Ok(Json(VersionedResponse {
        id: user_id,
        version,
        data: playlist,
    }))
}

/// Replace the playlist cover with the raw image in the request body.
///
/// The new blob is written before the document; it is removed again if the
/// document write is rejected.
pub async fn upload_playlist_cover(
    State(state): State<AppState>,
    Path((user_id, playlist_id)): Path<(String, String)>,
    query: std::result::Result<Query<VersionQuery>, QueryRejection>,
    body: Bytes,
) -> Result<Json<VersionedResponse<Playlist>>> {
    let Query(params) = query?;
    if body.is_empty() {
        return Err(AppError::BadRequest("cover image body is empty".to_string()));
    }
    let format = image::guess_format(&body)
        .map_err(|e| AppError::BadRequest(format!("cover is not a supported image: {e}")))?;

    let current = load::<User>(&state, &user_id).await?;
    if current.doc.playlist(&playlist_id).is_none() {
        return Err(AppError::NotFound(format!(
            "playlist not found: {playlist_id}"
        )));
    }
    let expected_version = params.expected_version.unwrap_or(current.version);

    let now = Utc::now();
    let key = playlist_cover_key(
        &user_id,
        &playlist_id,
        current.version,
        now.timestamp_millis(),
    );
    let url = state
        .blobs
        .create(&key, &body)
        .await
        .map_err(AppError::blob)?
        .ok_or_else(|| {
            AppError::Conflict(format!(
                "cover for playlist {playlist_id} was uploaded concurrently"
            ))
        })?;

    let mut user = current.doc;
    let previous = user.set_playlist_cover(&playlist_id, url, now)?;

    let version = match catalog_db::replace_document(
        &state.db_pool,
        &user_id,
        &user,
        expected_version,
        now.timestamp_millis(),
    )
    .await
    {
        Ok(version) => version,
        Err(e) => {
            if let Err(cleanup) = state.blobs.delete(&key).await {
                tracing::warn!("failed to remove orphaned cover {}: {cleanup:#}", key);
            }
            return Err(e.into());
        }
    };

    if let Some(previous) = previous {
        remove_managed_blob(&state, &previous).await;
    }

    let playlist = user
        .playlist(&playlist_id)
        .cloned()
        .ok_or_else(|| AppError::NotFound(format!("playlist not found: {playlist_id}")))?;

    tracing::info!(
        "users/{} playlist {} cover replaced ({:?}, {} bytes)",
        user_id,
        playlist_id,
        format,
        body.len()
    );

    Ok(Json(VersionedResponse {
        id: user_id,
        version,
        data: playlist,
    }))
}

pub async fn delete_playlist(
    State(state): State<AppState>,
    Path((user_id, playlist_id)): Path<(String, String)>,
    query: std::result::Result<Query<VersionQuery>, QueryRejection>,
) -> Result<Json<DeletedPlaylist>> {
    let Query(params) = query?;
    let current = load::<User>(&state, &user_id).await?;
    ensure_fresh(&current, params.expected_version)?;

    let now = Utc::now();
    let mut user = current.doc;
    let removed = user.remove_playlist(&playlist_id)?;

    let version = catalog_db::replace_document(
        &state.db_pool,
        &user_id,
        &user,
        current.version,
        now.timestamp_millis(),
    )
    .await?;

    if let Some(cover) = removed.cover_img_url.as_deref().filter(|url| !url.is_empty()) {
        remove_managed_blob(&state, cover).await;
    }

    tracing::info!("users/{} playlist {} deleted", user_id, playlist_id);

    Ok(Json(DeletedPlaylist {
        playlist_id,
        version,
    }))
}

/// Delete the blob behind `url` if this server handed it out. Failures are logged only.
async fn remove_managed_blob(state: &AppState, url: &str) {
    let Some(key) = state.blobs.key_from_url(url) else {
        tracing::debug!("cover {} is not a managed blob; leaving it", url);
        return;
    };

    match state.blobs.delete(&key).await {
        Ok(true) => tracing::debug!("removed cover blob {}", key),
        Ok(false) => tracing::debug!("cover blob {} was already gone", key),
        Err(e) => tracing::warn!("failed to remove cover blob {}: {e:#}", key),
    }
}
