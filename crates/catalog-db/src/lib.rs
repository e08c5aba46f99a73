use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use eyre::WrapErr;
use serde::de::DeserializeOwned;
use serde::Serialize;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use sqlx::{Pool, Sqlite};

use models::{Artist, User, ARTISTS_COLLECTION, USERS_COLLECTION};

pub mod blob;

pub use blob::BlobStore;

pub type SqlitePool = Pool<Sqlite>;

/// A document type stored whole under `(COLLECTION, id)`.
pub trait Document: Serialize + DeserializeOwned {
    const COLLECTION: &'static str;
}

impl Document for Artist {
    const COLLECTION: &'static str = ARTISTS_COLLECTION;
}

impl Document for User {
    const COLLECTION: &'static str = USERS_COLLECTION;
}

/// A document body with the version it was read at.
#[derive(Debug, Clone)]
pub struct Versioned<D> {
    pub id: String,
    pub version: i64,
    pub doc: D,
}

#[derive(Debug)]
pub enum StoreError {
    NotFound {
        collection: &'static str,
        id: String,
    },
    /// The stored version moved on since the caller read the document.
    Conflict {
        collection: &'static str,
        id: String,
        expected: i64,
        actual: i64,
    },
    Backend(eyre::Report),
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotFound { collection, id } => write!(f, "{collection}/{id} not found"),
            Self::Conflict {
                collection,
                id,
                expected,
                actual,
            } => write!(
                f,
                "{collection}/{id} was modified concurrently (expected version {expected}, found {actual})"
            ),
            Self::Backend(e) => write!(f, "document store error: {e:#}"),
        }
    }
}

impl std::error::Error for StoreError {}

impl From<eyre::Report> for StoreError {
    fn from(e: eyre::Report) -> Self {
        StoreError::Backend(e)
    }
}

pub async fn connect(database_url: &str) -> eyre::Result<SqlitePool> {
    let options = SqliteConnectOptions::from_str(database_url)
        .wrap_err("parse database url")?
        .create_if_missing(true)
        .journal_mode(SqliteJournalMode::Wal)
        .synchronous(SqliteSynchronous::Normal);

    SqlitePoolOptions::new()
        .max_connections(5)
        .connect_with(options)
        .await
        .wrap_err("connect sqlite")
}

pub async fn migrate(pool: &SqlitePool) -> eyre::Result<()> {
    sqlx::migrate!("./migrations")
        .run(pool)
        .await
        .wrap_err("run migrations")?;
    Ok(())
}

pub async fn ping(pool: &SqlitePool) -> eyre::Result<()> {
    sqlx::query("SELECT 1")
        .execute(pool)
        .await
        .wrap_err("ping sqlite")?;
    Ok(())
}

/// Filesystem path of a `sqlite://` url, if it names a file.
pub fn sqlite_file_path(database_url: &str) -> Option<PathBuf> {
    let path = database_url
        .strip_prefix("sqlite://")
        .or_else(|| database_url.strip_prefix("sqlite:"))?;
    let path = path.split('?').next().unwrap_or_default();
    if path.is_empty() || path == ":memory:" {
        return None;
    }
    Some(PathBuf::from(path))
}

pub async fn get_document<D: Document>(
    pool: &SqlitePool,
    id: &str,
) -> eyre::Result<Option<Versioned<D>>> {
    let row = sqlx::query_as::<_, (String, i64)>(
        "SELECT body, version FROM documents WHERE collection = ? AND id = ?",
    )
    .bind(D::COLLECTION)
    .bind(id)
    .fetch_optional(pool)
    .await
    .wrap_err_with(|| format!("fetch {}/{id}", D::COLLECTION))?;

    let Some((body, version)) = row else {
        return Ok(None);
    };

    let doc = serde_json::from_str(&body)
        .wrap_err_with(|| format!("decode {}/{id}", D::COLLECTION))?;

    Ok(Some(Versioned {
        id: id.to_string(),
        version,
        doc,
    }))
}

/// Every document in `D`'s collection, ordered by id.
///
/// Bodies that no longer decode as `D` are skipped.
pub async fn list_documents<D: Document>(pool: &SqlitePool) -> eyre::Result<Vec<(String, D)>> {
    let rows = sqlx::query_as::<_, (String, String)>(
        "SELECT id, body FROM documents WHERE collection = ? ORDER BY id",
    )
    .bind(D::COLLECTION)
    .fetch_all(pool)
    .await
    .wrap_err_with(|| format!("list {}", D::COLLECTION))?;

    let mut out = Vec::with_capacity(rows.len());
    for (id, body) in rows {
        match serde_json::from_str::<D>(&body) {
            Ok(doc) => out.push((id, doc)),
            Err(e) => {
                tracing::warn!("skipping undecodable document {}/{}: {}", D::COLLECTION, id, e)
            }
        }
    }

    Ok(out)
}

/// Insert or overwrite unconditionally. Returns the new version.
pub async fn upsert_document<D: Document>(
    pool: &SqlitePool,
    id: &str,
    doc: &D,
    updated_at: i64,
) -> eyre::Result<i64> {
    let body = serde_json::to_string(doc).wrap_err("serialize document")?;

    sqlx::query_scalar::<_, i64>(
        r#"
INSERT INTO documents (collection, id, body, version, updated_at)
VALUES (?1, ?2, ?3, 1, ?4)
ON CONFLICT(collection, id) DO UPDATE SET
  body = excluded.body,
  version = documents.version + 1,
  updated_at = excluded.updated_at
RETURNING version
"#,
    )
    .bind(D::COLLECTION)
    .bind(id)
    .bind(body)
    .bind(updated_at)
    .fetch_one(pool)
    .await
    .wrap_err_with(|| format!("upsert {}/{id}", D::COLLECTION))
}

/// Overwrite the whole document if it is still at `expected_version`.
///
/// Returns the new version.
pub async fn replace_document<D: Document>(
    pool: &SqlitePool,
    id: &str,
    doc: &D,
    expected_version: i64,
    updated_at: i64,
) -> Result<i64, StoreError> {
    let body = serde_json::to_string(doc).wrap_err("serialize document")?;

    let new_version = sqlx::query_scalar::<_, i64>(
        r#"
UPDATE documents
SET body = ?1, version = version + 1, updated_at = ?2
WHERE collection = ?3 AND id = ?4 AND version = ?5
RETURNING version
"#,
    )
    .bind(body)
    .bind(updated_at)
    .bind(D::COLLECTION)
    .bind(id)
    .bind(expected_version)
    .fetch_optional(pool)
    .await
    .wrap_err_with(|| format!("replace {}/{id}", D::COLLECTION))?;

    if let Some(version) = new_version {
        return Ok(version);
    }

    let current = sqlx::query_scalar::<_, i64>(
        "SELECT version FROM documents WHERE collection = ? AND id = ?",
    )
    .bind(D::COLLECTION)
    .bind(id)
    .fetch_optional(pool)
    .await
    .wrap_err_with(|| format!("read version of {}/{id}", D::COLLECTION))?;

    Err(match current {
        None => StoreError::NotFound {
            collection: D::COLLECTION,
            id: id.to_string(),
        },
        Some(actual) => StoreError::Conflict {
            collection: D::COLLECTION,
            id: id.to_string(),
            expected: expected_version,
            actual,
        },
    })
}
