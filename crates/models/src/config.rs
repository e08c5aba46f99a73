use std::path::PathBuf;

use eyre::WrapErr;

/// Location of the document database and the blob directory.
#[derive(Debug, Clone)]
pub struct StoreConfig {
    pub database_url: String,
    pub blob_dir: PathBuf,
    /// Prefix for blob download URLs handed out to clients.
    pub public_base_url: String,
}

impl StoreConfig {
    pub fn from_env() -> eyre::Result<Self> {
        let database_url = std::env::var("CATALOG_DATABASE_URL")
            .unwrap_or_else(|_| "sqlite://data/catalog.sqlite3".to_string());
        let blob_dir = std::env::var("CATALOG_BLOB_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("data/blobs"));
        let public_base_url = std::env::var("CATALOG_PUBLIC_BASE_URL")
            .unwrap_or_else(|_| "http://localhost:3002".to_string());

        if !public_base_url.starts_with("http://") && !public_base_url.starts_with("https://") {
            return Err(eyre::eyre!(
                "CATALOG_PUBLIC_BASE_URL must be an http(s) URL, got {public_base_url}"
            ))
            .wrap_err("invalid store config");
        }

        Ok(Self {
            database_url,
            blob_dir,
            public_base_url: public_base_url.trim_end_matches('/').to_string(),
        })
    }
}
