use std::collections::BTreeMap;
use std::path::PathBuf;

use clap::Parser;
use eyre::WrapErr;
use models::{Artist, User};
use serde::Deserialize;

#[derive(Parser, Debug)]
#[command(name = "catalog-seed")]
#[command(about = "Load artist and user documents into the catalog store", long_about = None)]
struct Args {
    /// JSON file shaped like `{ "artists": { "<id>": {...} }, "users": { "<id>": {...} } }`
    #[arg(short, long)]
    input: PathBuf,

    /// Overrides CATALOG_DATABASE_URL
    #[arg(long)]
    database_url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SeedFile {
    #[serde(default)]
    artists: BTreeMap<String, Artist>,
    #[serde(default)]
    users: BTreeMap<String, User>,
}

#[tokio::main]
async fn main() -> eyre::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "catalog_seed=info,catalog_db=info".into()),
        )
        .init();

    let args = Args::parse();

    let database_url = match args.database_url {
        Some(url) => url,
        None => {
            models::config::StoreConfig::from_env()
                .wrap_err("failed to load store config from env vars")?
                .database_url
        }
    };

    let bytes = std::fs::read(&args.input)
        .wrap_err_with(|| format!("failed to read seed file: {:?}", args.input))?;
    let seed: SeedFile = serde_json::from_slice(&bytes).wrap_err("parse seed file")?;

    if let Some(parent) = catalog_db::sqlite_file_path(&database_url)
        .as_deref()
        .and_then(|path| path.parent())
        .filter(|parent| !parent.as_os_str().is_empty())
    {
        std::fs::create_dir_all(parent)
            .wrap_err_with(|| format!("failed to create database directory: {parent:?}"))?;
    }

    let pool = catalog_db::connect(&database_url)
        .await
        .wrap_err("failed to connect to database")?;
    catalog_db::migrate(&pool)
        .await
        .wrap_err("failed to run migrations")?;

    let now = chrono::Utc::now().timestamp_millis();

    for (id, artist) in &seed.artists {
        let version = catalog_db::upsert_document(&pool, id, artist, now).await?;
        tracing::debug!("seeded artists/{} at version {}", id, version);
    }
    for (id, user) in &seed.users {
        let version = catalog_db::upsert_document(&pool, id, user, now).await?;
        tracing::debug!("seeded users/{} at version {}", id, version);
    }

    tracing::info!(
        "Seeded {} artists and {} users into {}",
        seed.artists.len(),
        seed.users.len(),
        database_url
    );

    Ok(())
}
