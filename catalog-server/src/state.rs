use catalog_db::{BlobStore, SqlitePool};

#[derive(Clone)]
pub struct AppState {
    pub db_pool: SqlitePool,
    pub blobs: BlobStore,
}
