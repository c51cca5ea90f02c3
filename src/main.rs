mod models;
mod handlers;
mod services;
mod middleware;
mod config;
mod errors;
mod routes;
mod state;

use anyhow::Context;
use std::sync::Arc;
use crate::{
    config::Config,
    models::ChallengeId,
    services::{CommentBoard, FlagBook, ProgressStore, VulnDb},
    state::AppState,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize basic tracing subscriber
    tracing_subscriber::fmt::init();

    // Load configuration
    let config = Config::load().context("Failed to load configuration")?;

    // Progress table
    let store = ProgressStore::new(&config.storage.progress_file);
    store
        .initialize()
        .await
        .context("Failed to initialize progress table")?;

    // Flags are drawn fresh for every run
    let flags = Arc::new(FlagBook::generate().context("Failed to build flags")?);
    tracing::info!("Flags generated for session {}", flags.session_id());

    // Database for the SQL injection challenges
    let db = VulnDb::connect(&config.database.url, config.database.max_connections)
        .await
        .context("Failed to open challenge database")?;
    db.seed(flags.flag(ChallengeId::SQL_DATA_EXTRACT))
        .await
        .context("Failed to seed challenge database")?;

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let state = AppState {
        store,
        flags,
        comments: CommentBoard::seeded(),
        db,
        config: Arc::new(config),
    };
    let app = routes::router(state);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    tracing::info!("CTF security challenge running on http://{}", addr);

    axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    tracing::info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
    }
}
