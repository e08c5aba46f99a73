use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use eyre::{ensure, WrapErr};
use models::config::StoreConfig;
use tokio::io::AsyncWriteExt;

const BLOB_ROUTE: &str = "/api/blobs/";

/// Binary objects (cover images) kept under a root directory.
///
/// Keys are `/`-separated relative paths, e.g.
/// `playlistCoverImg/u1/u1_p1_playlist_cover_1719822600000_v1`.
#[derive(Debug, Clone)]
pub struct BlobStore {
    root: PathBuf,
    public_base_url: String,
}

impl BlobStore {
    pub fn new(root: impl Into<PathBuf>, public_base_url: impl Into<String>) -> Self {
        let public_base_url = public_base_url.into();
        Self {
            root: root.into(),
            public_base_url: public_base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn from_config(config: &StoreConfig) -> Self {
        Self::new(config.blob_dir.clone(), config.public_base_url.clone())
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Store `bytes` under a key that must not exist yet. Returns its download URL,
    /// or `None` when the key is already taken.
    pub async fn create(&self, key: &str, bytes: &[u8]) -> eyre::Result<Option<String>> {
        let path = self.path_for(key)?;
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .wrap_err_with(|| format!("create blob dir for {key}"))?;
        }

        let mut file = match tokio::fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
            .await
        {
            Ok(file) => file,
            Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                tracing::debug!("blob: {} already exists", key);
                return Ok(None);
            }
            Err(e) => return Err(e).wrap_err_with(|| format!("create blob {key}")),
        };
        file.write_all(bytes)
            .await
            .wrap_err_with(|| format!("write blob {key}"))?;
        file.flush()
            .await
            .wrap_err_with(|| format!("flush blob {key}"))?;

        tracing::debug!("blob: stored {} ({} bytes)", key, bytes.len());
        Ok(Some(self.url_for(key)))
    }

    pub async fn get(&self, key: &str) -> eyre::Result<Option<Vec<u8>>> {
        let path = self.path_for(key)?;
        match tokio::fs::read(&path).await {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e).wrap_err_with(|| format!("read blob {key}")),
        }
    }

    /// Remove the object at `key`. Returns `false` when there was nothing to remove.
    pub async fn delete(&self, key: &str) -> eyre::Result<bool> {
        let path = self.path_for(key)?;
        match tokio::fs::remove_file(&path).await {
            Ok(()) => {
                tracing::debug!("blob: deleted {}", key);
                Ok(true)
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e).wrap_err_with(|| format!("delete blob {key}")),
        }
    }

    pub fn url_for(&self, key: &str) -> String {
        let encoded = key
            .split('/')
            .map(|segment| urlencoding::encode(segment).into_owned())
            .collect::<Vec<_>>()
            .join("/");
        format!("{}{}{}", self.public_base_url, BLOB_ROUTE, encoded)
    }

    /// Inverse of [`BlobStore::url_for`]; `None` for URLs this store did not hand out.
    pub fn key_from_url(&self, url: &str) -> Option<String> {
        let encoded = url
            .strip_prefix(&self.public_base_url)?
            .strip_prefix(BLOB_ROUTE)?;

        let mut segments = Vec::new();
        for segment in encoded.split('/') {
            segments.push(urlencoding::decode(segment).ok()?.into_owned());
        }
        let key = segments.join("/");

        validate_key(&key).ok()?;
        Some(key)
    }

    fn path_for(&self, key: &str) -> eyre::Result<PathBuf> {
        validate_key(key)?;
        Ok(key.split('/').fold(self.root.clone(), |path, segment| path.join(segment)))
    }
}

pub fn validate_key(key: &str) -> eyre::Result<()> {
    ensure!(!key.is_empty(), "blob key is empty");
    ensure!(!key.starts_with('/'), "blob key must be relative: {key}");
    ensure!(!key.contains('\\'), "blob key must not contain backslashes: {key}");
    ensure!(
        key.split('/')
            .all(|segment| !segment.is_empty() && segment != "." && segment != ".."),
        "blob key has an invalid segment: {key}"
    );
    Ok(())
}

/// Key for a freshly uploaded playlist cover, written against `version` of the
/// owning user document.
pub fn playlist_cover_key(
    user_id: &str,
    playlist_id: &str,
    version: i64,
    uploaded_at_millis: i64,
) -> String {
    format!(
        "playlistCoverImg/{user_id}/{user_id}_{playlist_id}_playlist_cover_{uploaded_at_millis}_v{version}"
    )
}
