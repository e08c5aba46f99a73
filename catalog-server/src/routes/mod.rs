mod artists;
mod blobs;
mod browse;
mod health;
mod playlists;
mod responses;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, put},
    Router,
};
use catalog_db::{Document, Versioned};
use tower_http::cors::CorsLayer;
use tower_http::trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer};
use tower_http::LatencyUnit;

use crate::error::{AppError, Result};
use crate::state::AppState;

pub(crate) fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health))
        .route("/health/ready", get(health::ready))
        .route("/api/artists/suggest", get(artists::suggest_artists))
        .route(
            "/api/artists/{artist_id}",
            get(artists::get_artist).put(artists::update_artist),
        )
        .route(
            "/api/artists/{artist_id}/songs/suggest",
            get(artists::suggest_artist_songs),
        )
        .route(
            "/api/artists/{artist_id}/songs/{song_id}",
            put(artists::update_artist_song),
        )
        .route(
            "/api/users/{user_id}/songs/suggest",
            get(playlists::suggest_library_songs),
        )
        .route(
            "/api/users/{user_id}/playlists/{playlist_id}",
            get(playlists::get_playlist)
                .put(playlists::update_playlist)
                .delete(playlists::delete_playlist),
        )
        .route(
            "/api/users/{user_id}/playlists/{playlist_id}/cover",
            put(playlists::upload_playlist_cover)
                .layer(DefaultBodyLimit::max(playlists::MAX_COVER_BYTES)),
        )
        .route(
            "/api/users/{user_id}/recommended-artists",
            get(browse::recommended_artists),
        )
        .route("/api/blobs/{*key}", get(blobs::get_blob))
        .layer(CorsLayer::permissive())
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(tracing::Level::INFO))
                .on_response(
                    DefaultOnResponse::new()
                        .level(tracing::Level::INFO)
                        .latency_unit(LatencyUnit::Millis),
                ),
        )
        .with_state(state)
}

pub(crate) async fn load<D: Document>(state: &AppState, id: &str) -> Result<Versioned<D>> {
    catalog_db::get_document::<D>(&state.db_pool, id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("{}/{} not found", D::COLLECTION, id)))
}

/// Reject writes based on a read older than the stored document.
pub(crate) fn ensure_fresh<D>(current: &Versioned<D>, expected: Option<i64>) -> Result<()> {
    match expected {
        Some(expected) if expected != current.version => Err(AppError::Conflict(format!(
            "{} was modified concurrently (expected version {}, found {})",
            current.id, expected, current.version
        ))),
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{to_bytes, Body};
    use axum::http::{Request, StatusCode};
    use axum::response::Response;
    use catalog_db::BlobStore;
    use models::{Artist, User};
    use serde_json::{json, Value};
    use tower::ServiceExt;

    struct Fixture {
        _dir: tempfile::TempDir,
        state: AppState,
    }

    async fn fixture() -> Fixture {
        let dir = tempfile::tempdir().unwrap();
        let db_path = dir.path().join("catalog.sqlite3");
        let db_pool = catalog_db::connect(&format!("sqlite://{}", db_path.display()))
            .await
            .unwrap();
        catalog_db::migrate(&db_pool).await.unwrap();

        let blobs = BlobStore::new(dir.path().join("blobs"), "http://localhost:3002");

        let artists = json!({
            "a1": { "name": "Zebra", "artistType": "foreigner", "gender": "male" },
            "a2": { "name": "Azebra", "artistType": "indian", "gender": "male" },
            "a3": {
                "name": "Abba",
                "artistType": "indian",
                "gender": "male",
                "songs": [
                    { "songId": "s1", "songName": "Dancing Queen", "songUrl": "u1" },
                    { "songId": "s2", "songName": "Mamma Mia", "songUrl": "u2" }
                ]
            }
        });
        for (id, doc) in artists.as_object().unwrap() {
            let artist: Artist = serde_json::from_value(doc.clone()).unwrap();
            catalog_db::upsert_document(&db_pool, id, &artist, 1)
                .await
                .unwrap();
        }

        let user: User = serde_json::from_value(json!({
            "artists": ["a3"],
            "mysongs": [
                { "songId": "s1", "songName": "Dancing Queen", "singer": "Abba" },
                { "songId": "s9", "songName": "Queen of Hearts", "singer": "Juice Newton" }
            ],
            "myplaylists": [
                { "playlistId": "p1", "playlistName": "Disco", "songs": [] },
                { "playlistId": "p2", "playlistName": "Other", "coverImgUrl": "https://cdn.example.com/x.png", "songs": [] }
            ]
        }))
        .unwrap();
        catalog_db::upsert_document(&db_pool, "u1", &user, 1)
            .await
            .unwrap();

        Fixture {
            _dir: dir,
            state: AppState { db_pool, blobs },
        }
    }

    async fn send(state: &AppState, request: Request<Body>) -> Response {
        create_router(state.clone()).oneshot(request).await.unwrap()
    }

    async fn body_json(response: Response) -> Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    fn get_req(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    fn json_req(method: &str, uri: &str, body: Value) -> Request<Body> {
        Request::builder()
            .method(method)
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    fn cover_req(uri: &str, bytes: &'static [u8]) -> Request<Body> {
        Request::builder()
            .method("PUT")
            .uri(uri)
            .header("content-type", "application/octet-stream")
            .body(Body::from(bytes))
            .unwrap()
    }

    const PNG: &[u8] = b"\x89PNG\r\n\x1a\nfirst";

    fn names(value: &Value) -> Vec<String> {
        value
            .as_array()
            .unwrap()
            .iter()
            .map(|s| s["name"].as_str().unwrap().to_string())
            .collect()
    }

    #[tokio::test]
    async fn health_and_ready() {
        let fx = fixture().await;
        let response = send(&fx.state, get_req("/health")).await;
        assert_eq!(response.status(), StatusCode::OK);

        let response = send(&fx.state, get_req("/health/ready")).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await["status"], "ready");
    }

    #[tokio::test]
    async fn artist_suggestions_are_ranked() {
        let fx = fixture().await;

        let response = send(&fx.state, get_req("/api/artists/suggest?q=a")).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            names(&body_json(response).await),
            vec!["Abba", "Azebra", "Zebra"]
        );

        let response = send(&fx.state, get_req("/api/artists/suggest?q=")).await;
        assert_eq!(body_json(response).await, json!([]));

        let response = send(&fx.state, get_req("/api/artists/suggest")).await;
        assert_eq!(body_json(response).await, json!([]));
    }

    #[tokio::test]
    async fn artist_update_uses_versions() {
        let fx = fixture().await;

        let response = send(&fx.state, get_req("/api/artists/a2")).await;
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["version"], 1);
        assert_eq!(body["data"]["name"], "Azebra");

        let update = json!({
            "name": "A. Zebra",
            "photo_url": "https://img/a2.png",
            "artist_type": "indian",
            "gender": "female",
            "expected_version": 1
        });
        let response = send(&fx.state, json_req("PUT", "/api/artists/a2", update.clone())).await;
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["version"], 2);
        assert_eq!(body["data"]["photoURL"], "https://img/a2.png");
        assert_eq!(body["data"]["gender"], "female");
        assert!(body["data"]["updatedOn"].is_string());

        let response = send(&fx.state, json_req("PUT", "/api/artists/a2", update)).await;
        assert_eq!(response.status(), StatusCode::CONFLICT);
        assert_eq!(body_json(response).await["code"], "CONFLICT");
    }

    #[tokio::test]
    async fn artist_update_validation_and_missing() {
        let fx = fixture().await;

        let response = send(
            &fx.state,
            json_req("PUT", "/api/artists/a1", json!({ "name": "  " })),
        )
        .await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let response = send(&fx.state, get_req("/api/artists/nope")).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(body_json(response).await["code"], "NOT_FOUND");
    }

    #[tokio::test]
    async fn song_suggest_and_update() {
        let fx = fixture().await;

        let response = send(&fx.state, get_req("/api/artists/a3/songs/suggest?q=MIA")).await;
        let body = body_json(response).await;
        assert_eq!(body, json!([{ "id": "s2", "name": "Mamma Mia" }]));

        let response = send(
            &fx.state,
            json_req(
                "PUT",
                "/api/artists/a3/songs/s2",
                json!({ "song_name": "Mamma Mia!", "song_url": "u2b" }),
            ),
        )
        .await;
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["data"]["songName"], "Mamma Mia!");
        assert_eq!(body["version"], 2);

        let stored = catalog_db::get_document::<Artist>(&fx.state.db_pool, "a3")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.doc.songs[0].song_name.as_deref(), Some("Dancing Queen"));
        assert_eq!(stored.doc.songs[1].song_url.as_deref(), Some("u2b"));

        let response = send(
            &fx.state,
            json_req(
                "PUT",
                "/api/artists/a3/songs/s404",
                json!({ "song_name": "x" }),
            ),
        )
        .await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn playlist_picker_and_update() {
        let fx = fixture().await;

        let response = send(&fx.state, get_req("/api/users/u1/songs/suggest?q=queen")).await;
        assert_eq!(
            names(&body_json(response).await),
            vec!["Queen of Hearts", "Dancing Queen"]
        );

        let response = send(
            &fx.state,
            json_req(
                "PUT",
                "/api/users/u1/playlists/p1",
                json!({ "playlist_name": "Disco Night", "song_ids": ["s9", "s1", "s9"] }),
            ),
        )
        .await;
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["data"]["playlistName"], "Disco Night");
        assert_eq!(body["data"]["songs"].as_array().unwrap().len(), 2);

        let response = send(&fx.state, get_req("/api/users/u1/playlists/p1")).await;
        let body = body_json(response).await;
        assert_eq!(body["version"], 2);
        assert_eq!(body["data"]["songs"][0]["songId"], "s9");

        let response = send(&fx.state, get_req("/api/users/u1/playlists/p9")).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn cover_upload_then_delete_playlist() {
        let fx = fixture().await;

        let response = send(&fx.state, cover_req("/api/users/u1/playlists/p1/cover", PNG)).await;
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        let url = body["data"]["coverImgUrl"].as_str().unwrap().to_string();
        let key = fx.state.blobs.key_from_url(&url).unwrap();
        assert!(key.starts_with("playlistCoverImg/u1/u1_p1_playlist_cover_"));

        let path = format!("/api/blobs/{key}");
        let response = send(&fx.state, get_req(&path)).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers().get("content-type").unwrap(),
            "image/png"
        );

        let response = send(
            &fx.state,
            Request::builder()
                .method("DELETE")
                .uri("/api/users/u1/playlists/p1")
                .body(Body::empty())
                .unwrap(),
        )
        .await;
        assert_eq!(response.status(), StatusCode::OK);
        assert!(fx.state.blobs.get(&key).await.unwrap().is_none());

        let stored = catalog_db::get_document::<User>(&fx.state.db_pool, "u1")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.doc.myplaylists.len(), 1);
        assert_eq!(stored.doc.myplaylists[0].playlist_id, "p2");
    }

    #[tokio::test]
    async fn empty_cover_is_rejected() {
        let fx = fixture().await;
        let request = Request::builder()
            .method("PUT")
            .uri("/api/users/u1/playlists/p1/cover")
            .body(Body::empty())
            .unwrap();
        let response = send(&fx.state, request).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn second_cover_replaces_first_blob() {
        let fx = fixture().await;
        let uri = "/api/users/u1/playlists/p1/cover";

        let response = send(&fx.state, cover_req(uri, PNG)).await;
        assert_eq!(response.status(), StatusCode::OK);
        let first = body_json(response).await["data"]["coverImgUrl"]
            .as_str()
            .unwrap()
            .to_string();
        let first_key = fx.state.blobs.key_from_url(&first).unwrap();

        let jpeg: &[u8] = &[0xff, 0xd8, 0xff, 0xe0, 0x00, 0x10, b'J', b'F', b'I', b'F'];
        let response = send(&fx.state, cover_req(uri, jpeg)).await;
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["version"], 3);
        let second = body["data"]["coverImgUrl"].as_str().unwrap().to_string();
        let second_key = fx.state.blobs.key_from_url(&second).unwrap();
        assert_ne!(first_key, second_key);

        assert!(fx.state.blobs.get(&first_key).await.unwrap().is_none());
        assert_eq!(
            fx.state.blobs.get(&second_key).await.unwrap().as_deref(),
            Some(jpeg)
        );

        let response = send(&fx.state, get_req(&format!("/api/blobs/{second_key}"))).await;
        assert_eq!(
            response.headers().get("content-type").unwrap(),
            "image/jpeg"
        );
    }

    #[tokio::test]
    async fn stale_cover_upload_leaves_no_blob() {
        let fx = fixture().await;

        let response = send(
            &fx.state,
            cover_req("/api/users/u1/playlists/p1/cover?expected_version=7", PNG),
        )
        .await;
        assert_eq!(response.status(), StatusCode::CONFLICT);
        assert_eq!(body_json(response).await["code"], "CONFLICT");

        let cover_dir = fx.state.blobs.root().join("playlistCoverImg/u1");
        let leftover = match std::fs::read_dir(&cover_dir) {
            Ok(entries) => entries.count(),
            Err(_) => 0,
        };
        assert_eq!(leftover, 0);

        let stored = catalog_db::get_document::<User>(&fx.state.db_pool, "u1")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.version, 1);
        assert_eq!(stored.doc.myplaylists[0].cover_img_url, None);
    }

    #[tokio::test]
    async fn non_image_cover_is_rejected() {
        let fx = fixture().await;

        let response = send(
            &fx.state,
            cover_req("/api/users/u1/playlists/p1/cover", b"this is not an image"),
        )
        .await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_json(response).await["code"], "BAD_REQUEST");
        assert!(!fx.state.blobs.root().join("playlistCoverImg").exists());

        let response = send(&fx.state, get_req("/api/users/u1/playlists/p1")).await;
        let body = body_json(response).await;
        assert_eq!(body["version"], 1);
        assert!(body["data"].get("coverImgUrl").is_none());
    }

    #[tokio::test]
    async fn library_picker_matches_singer() {
        let fx = fixture().await;

        let response = send(&fx.state, get_req("/api/users/u1/songs/suggest?q=newton")).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            body_json(response).await,
            json!([{ "id": "s9", "name": "Queen of Hearts" }])
        );

        let response = send(&fx.state, get_req("/api/users/u1/songs/suggest?q=ABBA")).await;
        assert_eq!(names(&body_json(response).await), vec!["Dancing Queen"]);
    }

    #[tokio::test]
    async fn malformed_requests_get_error_body() {
        let fx = fixture().await;

        let response = send(
            &fx.state,
            get_req("/api/users/u1/recommended-artists?artist_type=indian"),
        )
        .await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = body_json(response).await;
        assert_eq!(body["code"], "BAD_REQUEST");
        assert!(body["message"].as_str().unwrap().contains("gender"));

        let request = Request::builder()
            .method("PUT")
            .uri("/api/artists/a1")
            .header("content-type", "application/json")
            .body(Body::from("{ not json"))
            .unwrap();
        let response = send(&fx.state, request).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_json(response).await["code"], "BAD_REQUEST");

        let response = send(
            &fx.state,
            json_req(
                "PUT",
                "/api/users/u1/playlists/p1",
                json!({ "song_ids": "s1" }),
            ),
        )
        .await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_json(response).await["code"], "BAD_REQUEST");
    }

    #[tokio::test]
    async fn recommendations_skip_followed() {
        let fx = fixture().await;

        let response = send(
            &fx.state,
            get_req("/api/users/u1/recommended-artists?artist_type=indian&gender=male"),
        )
        .await;
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        let ids: Vec<_> = body
            .as_array()
            .unwrap()
            .iter()
            .map(|c| c["id"].as_str().unwrap().to_string())
            .collect();
        assert_eq!(ids, vec!["a2"]);

        let response = send(
            &fx.state,
            get_req("/api/users/ghost/recommended-artists?artist_type=indian&gender=male&limit=1"),
        )
        .await;
        let body = body_json(response).await;
        assert_eq!(body.as_array().unwrap().len(), 1);
        assert_eq!(body[0]["id"], "a2");
    }

    #[tokio::test]
    async fn missing_blob_is_not_found() {
        let fx = fixture().await;
        let response = send(&fx.state, get_req("/api/blobs/playlistCoverImg/u1/none")).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn stale_expected_version_conflicts() {
        let current = Versioned {
            id: "u1".to_string(),
            version: 3,
            doc: (),
        };
        assert!(ensure_fresh(&current, None).is_ok());
        assert!(ensure_fresh(&current, Some(3)).is_ok());
        assert!(matches!(
            ensure_fresh(&current, Some(2)),
            Err(AppError::Conflict(_))
        ));
    }
}
