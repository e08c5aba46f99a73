use axum::{
    extract::{rejection::QueryRejection, Path, Query, State},
    Json,
};
use models::{Artist, ArtistRecord, ArtistType, Gender, User};
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct RecommendQuery {
    artist_type: ArtistType,
    gender: Gender,
    #[serde(default)]
    limit: Option<usize>,
}

#[derive(Debug, Serialize)]
pub struct ArtistCard {
    id: String,
    name: Option<String>,
    photo_url: Option<String>,
}

/// Artists of one type and gender the user does not follow yet.
///
/// An unknown user follows nobody.
pub async fn recommended_artists(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
    query: std::result::Result<Query<RecommendQuery>, QueryRejection>,
) -> Result<Json<Vec<ArtistCard>>> {
    let Query(params) = query?;
    let user = catalog_db::get_document::<User>(&state.db_pool, &user_id)
        .await?
        .map(|current| current.doc)
        .unwrap_or_default();

    let records: Vec<ArtistRecord> = catalog_db::list_documents::<Artist>(&state.db_pool)
        .await?
        .into_iter()
        .map(|(id, artist)| ArtistRecord { id, artist })
        .collect();

    let cards = user
        .recommended_artists(&records, params.artist_type, params.gender)
        .into_iter()
        .take(params.limit.unwrap_or(usize::MAX))
        .map(|record| ArtistCard {
            id: record.id.clone(),
            name: record.artist.name.clone(),
            photo_url: record.artist.photo_url.clone(),
        })
        .collect();

    Ok(Json(cards))
}
