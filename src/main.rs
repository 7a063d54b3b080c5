use anyhow::{Context, Result};
use std::{io::ErrorKind, sync::Arc};
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

mod config;
mod db;
mod errors;
mod handlers;
mod models;
mod query;
mod routes;
mod services;
mod state;
#[cfg(test)]
mod test_support;

use services::{
    bootcamp_service::BootcampService, geocoder::MapQuestGeocoder, upload_store::UploadStore,
};
use state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    // --- Environment file (optional) ---
    let dotenv_result = dotenvy::dotenv();

    // --- Logging setup ---
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    if let Ok(path) = dotenv_result {
        tracing::debug!("Loaded environment from {}", path.display());
    }

    // --- Parse config + migrate flag ---
    let (cfg, migrate) = config::AppConfig::from_env_and_args()?;
    if cfg.geocoder_api_key.is_none() {
        tracing::warn!("GEOCODER_API_KEY is not set; address and radius lookups will fail");
    }
    tracing::info!(
        "Starting bootcamp directory on {} (db: {}, uploads: {})",
        cfg.addr(),
        cfg.database_url,
        cfg.upload_dir
    );

    // --- Ensure upload directory exists ---
    tokio::fs::create_dir_all(&cfg.upload_dir)
        .await
        .with_context(|| format!("creating upload directory {}", cfg.upload_dir))?;

    // --- Initialize SQLite connection + schema ---
    let db = db::connect(&cfg.database_url).await?;
    db::run_migrations(&db).await?;

    if migrate {
        tracing::info!("Database migration complete.");
        return Ok(());
    }

    // --- Initialize services ---
    let geocoder = MapQuestGeocoder::new(cfg.geocoder_url.clone(), cfg.geocoder_api_key.clone())
        .context("building geocoder client")?;
    let state = AppState::new(
        BootcampService::new(Arc::new(db)),
        Arc::new(geocoder),
        UploadStore::new(&cfg.upload_dir, cfg.max_file_upload),
    );

    // --- Build router ---
    let app = routes::routes::app(state);

    // --- Start server ---
    let addr = cfg.addr();
    let listener = match TcpListener::bind(&addr).await {
        Ok(listener) => listener,
        Err(err)
            if err.kind() == ErrorKind::PermissionDenied
                && matches!(cfg.host.as_str(), "0.0.0.0" | "::") =>
        {
            let fallback_addr = format!("127.0.0.1:{}", cfg.port);
            tracing::warn!(
                "Permission denied binding to {} ({}). Falling back to {}",
                addr,
                err,
                fallback_addr
            );
            TcpListener::bind(&fallback_addr).await?
        }
        Err(err) => return Err(err.into()),
    };

    tracing::info!("Server listening on http://{}", listener.local_addr()?);
    axum::serve(listener, app).await?;

    Ok(())
}
