//! sightbot-detect - Object detection inference service
//!
//! Receives an image key over HTTP, runs the detector on the stored image,
//! uploads the annotated copy, persists a prediction summary and returns it.

use anyhow::{Context, Result};
use clap::Parser;
use std::sync::Arc;
use tracing::info;

use sightbot_common::config::init_tracing;
use sightbot_common::object_store::connect_object_store;
use sightbot_common::shutdown::shutdown_signal;
use sightbot_common::ClassNames;
use sightbot_detect::config::{Args, DetectConfig, DetectToml};
use sightbot_detect::db::{self, SqlitePredictionStore};
use sightbot_detect::services::{CommandRunner, InferenceOrchestrator};
use sightbot_detect::{build_router, AppState};

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let toml = DetectToml::load(&args)?;

    init_tracing(&toml.logging);

    info!(
        "Starting sightbot-detect v{} [{}] built {} ({})",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_HASH"),
        env!("BUILD_TIMESTAMP"),
        env!("BUILD_PROFILE")
    );

    let config = DetectConfig::resolve(args, toml)?;

    // Process-wide context: one store client, one pool, one class table
    let store = connect_object_store(&config.object_store).await?;
    let class_names = ClassNames::load(&config.classes_file)?;

    let pool = db::init_database_pool(&config.database_url).await?;
    info!("Prediction database connected");
    let predictions = Arc::new(SqlitePredictionStore::new(pool.clone()));

    std::fs::create_dir_all(&config.work_root)
        .with_context(|| format!("Failed to create work root {}", config.work_root.display()))?;
    // Absolute, so detector paths stay valid under its own working directory
    let work_root = std::fs::canonicalize(&config.work_root)
        .with_context(|| format!("Failed to resolve work root {}", config.work_root.display()))?;

    let orchestrator = Arc::new(InferenceOrchestrator::new(
        store,
        Arc::new(CommandRunner::new(config.detector.clone())),
        predictions.clone(),
        class_names,
        work_root,
        config.retry,
    ));

    let app = build_router(AppState::new(orchestrator, predictions));

    let listener = tokio::net::TcpListener::bind(config.listen)
        .await
        .with_context(|| format!("Failed to bind to {}", config.listen))?;
    info!("Listening on http://{}", config.listen);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    pool.close().await;
    info!("Prediction database closed, shutdown complete");
    Ok(())
}
