mod config;
mod error;
mod routes;
mod state;

use eyre::WrapErr;
use std::net::SocketAddr;
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> eyre::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    tracing::info!("Catalog server starting...");

    let config = config::Config::from_env().wrap_err("Failed to load catalog config")?;

    std::fs::create_dir_all(&config.store.blob_dir).wrap_err("Failed to create blob directory")?;
    if let Some(parent) = catalog_db::sqlite_file_path(&config.store.database_url)
        .as_deref()
        .and_then(|path| path.parent())
        .filter(|parent| !parent.as_os_str().is_empty())
    {
        std::fs::create_dir_all(parent).wrap_err("Failed to create database directory")?;
    }

    let db_pool = catalog_db::connect(&config.store.database_url)
        .await
        .wrap_err("Failed to connect to database")?;

    tracing::info!("Database connected successfully");

    catalog_db::migrate(&db_pool)
        .await
        .wrap_err("Failed to run database migrations")?;
    tracing::info!("Database migrations completed successfully");

    let app_state = state::AppState {
        db_pool,
        blobs: catalog_db::BlobStore::from_config(&config.store),
    };

    tracing::info!("Blob store rooted at {}", app_state.blobs.root().display());

    let app = routes::create_router(app_state);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    let listener = TcpListener::bind(&addr)
        .await
        .wrap_err("Failed to bind to address")?;

    tracing::info!("Server listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .wrap_err("Server error")?;

    Ok(())
}

async fn shutdown_signal() {
    use tokio::signal::unix::{signal, SignalKind};

    let mut sigterm = signal(SignalKind::terminate()).expect("install SIGTERM handler");
    tokio::select! {
        _ = sigterm.recv() => {},
        _ = tokio::signal::ctrl_c() => {},
    }
    tracing::info!("Shutdown signal received");
}
