// Census Query - Web Server
// REST API with Axum over the in-memory census dataset

use anyhow::{Context, Result};
use census_query::api::{router, AppState};
use census_query::{AppConfig, CensusStore, ExifDecoder, QueryEngine};
use log::info;
use std::sync::Arc;

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = AppConfig::from_env()?;

    // The dataset is loaded exactly once; a schema error stops startup here
    let store = CensusStore::load(&config.data_path)
        .with_context(|| format!("Failed to load census dataset {:?}", config.data_path))?;

    let engine = QueryEngine::with_max_age_span(Arc::new(store), config.max_age_span);
    let state = AppState::new(engine, Arc::new(ExifDecoder));
    let app = router(state);

    let listener = tokio::net::TcpListener::bind(&config.bind_addr)
        .await
        .with_context(|| format!("Failed to bind to {}", config.bind_addr))?;

    info!("Server running on http://{}", config.bind_addr);
    info!("API: http://{}/api/entities", config.bind_addr);

    axum::serve(listener, app)
        .await
        .context("Server stopped unexpectedly")?;

    Ok(())
}
