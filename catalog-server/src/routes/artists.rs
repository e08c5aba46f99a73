use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Path, Query, State,
    },
    Json,
};
use chrono::Utc;
use models::{Artist, ArtistDetails, ArtistRecord, ArtistSong, SongEdit};
use serde::Deserialize;

use crate::error::Result;
use crate::routes::responses::{suggestions, SuggestQuery, Suggestion, VersionedResponse};
use crate::routes::{ensure_fresh, load};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct UpdateArtistRequest {
    #[serde(flatten)]
    details: ArtistDetails,
    #[serde(default)]
    expected_version: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateSongRequest {
    #[serde(flatten)]
    edit: SongEdit,
    #[serde(default)]
    expected_version: Option<i64>,
}

pub async fn suggest_artists(
    State(state): State<AppState>,
    query: std::result::Result<Query<SuggestQuery>, QueryRejection>,
) -> Result<Json<Vec<Suggestion>>> {
    let Query(params) = query?;
    if params.q.is_empty() {
        return Ok(Json(Vec::new()));
    }

    let records: Vec<ArtistRecord> = catalog_db::list_documents::<Artist>(&state.db_pool)
        .await?
        .into_iter()
        .map(|(id, artist)| ArtistRecord { id, artist })
        .collect();

    let ranked = suggest::rank(&records, &params.q);
    tracing::debug!(
        "artist suggestions for {:?}: {} of {}",
        params.q,
        ranked.len(),
        records.len()
    );

    Ok(Json(suggestions(ranked)))
}

pub async fn get_artist(
    State(state): State<AppState>,
    Path(artist_id): Path<String>,
) -> Result<Json<VersionedResponse<Artist>>> {
    let current = load::<Artist>(&state, &artist_id).await?;

    Ok(Json(VersionedResponse {
        id: current.id,
        version: current.version,
        data: current.doc,
    }))
}

pub async fn update_artist(
    State(state): State<AppState>,
    Path(artist_id): Path<String>,
    payload: std::result::Result<Json<UpdateArtistRequest>, JsonRejection>,
) -> Result<Json<VersionedResponse<Artist>>> {
    let Json(req) = payload?;
    let current = load::<Artist>(&state, &artist_id).await?;
    ensure_fresh(&current, req.expected_version)?;

    let now = Utc::now();
    let mut artist = current.doc;
    artist.apply_details(req.details, now)?;

    let version = catalog_db::replace_document(
        &state.db_pool,
        &artist_id,
        &artist,
        current.version,
        now.timestamp_millis(),
    )
    .await?;

    tracing::info!("artists/{} updated to version {}", artist_id, version);

    Ok(Json(VersionedResponse {
        id: artist_id,
        version,
        data: artist,
    }))
}

pub async fn suggest_artist_songs(
    State(state): State<AppState>,
    Path(artist_id): Path<String>,
    query: std::result::Result<Query<SuggestQuery>, QueryRejection>,
) -> Result<Json<Vec<Suggestion>>> {
    let Query(params) = query?;
    let current = load::<Artist>(&state, &artist_id).await?;
    let ranked = suggest::rank(&current.doc.songs, &params.q);

    Ok(Json(suggestions(ranked)))
}

pub async fn update_artist_song(
    State(state): State<AppState>,
    Path((artist_id, song_id)): Path<(String, String)>,
    payload: std::result::Result<Json<UpdateSongRequest>, JsonRejection>,
) -> Result<Json<VersionedResponse<ArtistSong>>> {
    let Json(req) = payload?;
    let current = load::<Artist>(&state, &artist_id).await?;
    ensure_fresh(&current, req.expected_version)?;

    let now = Utc::now();
    let mut artist = current.doc;
    let song = artist.update_song(&song_id, req.edit, now)?.clone();

    let version = catalog_db::replace_document(
        &state.db_pool,
        &artist_id,
        &artist,
        current.version,
        now.timestamp_millis(),
    )
    .await?;

    tracing::info!(
        "artists/{} song {} updated, document at version {}",
        artist_id,
        song_id,
        version
    );

    Ok(Json(VersionedResponse {
        id: artist_id,
        version,
        data: song,
    }))
}
