//! sightbot-gateway - Chat ingestion gateway
//!
//! Receives Telegram webhook updates and answers them with the configured
//! handler: echo, quote, or object detection through sightbot-detect.

use anyhow::{Context, Result};
use clap::Parser;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

use sightbot_common::config::init_tracing;
use sightbot_common::object_store::connect_object_store;
use sightbot_common::shutdown::shutdown_signal;
use sightbot_gateway::config::{Args, GatewayConfig, GatewayToml};
use sightbot_gateway::inference_client::HttpInferenceClient;
use sightbot_gateway::transport::{ChatTransport, TelegramTransport};
use sightbot_gateway::{
    build_router, AppState, EchoHandler, HandlerMode, IngestionGateway, MessageHandler, QuoteHandler,
};

/// Longest wait for in-flight updates after the server stops
const DRAIN_TIMEOUT: Duration = Duration::from_secs(90);

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let toml = GatewayToml::load(&args)?;

    init_tracing(&toml.logging);

    info!(
        "Starting sightbot-gateway v{} [{}] built {} ({})",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_HASH"),
        env!("BUILD_TIMESTAMP"),
        env!("BUILD_PROFILE")
    );

    let config = GatewayConfig::resolve(args, toml)?;

    let telegram = Arc::new(TelegramTransport::new(&config.telegram_api_url, &config.telegram_token)?);
    if let Some(app_url) = &config.telegram_app_url {
        telegram
            .register_webhook(app_url)
            .await
            .context("Webhook registration failed")?;
    }
    let transport: Arc<dyn ChatTransport> = telegram;

    let handler: Arc<dyn MessageHandler> = match (config.mode, &config.detect) {
        (HandlerMode::Echo, _) => Arc::new(EchoHandler::new(transport)),
        (HandlerMode::Quote, _) => Arc::new(QuoteHandler::new(transport)),
        (HandlerMode::Detect, Some(detect)) => {
            let store = connect_object_store(&detect.object_store).await?;
            let inference = Arc::new(HttpInferenceClient::new(&detect.yolo_url, detect.inference_timeout)?);
            info!(yolo_url = %detect.yolo_url, timeout_secs = detect.inference_timeout.as_secs(), "Detection service configured");
            Arc::new(IngestionGateway::new(
                transport,
                store,
                inference,
                detect.photos_dir.clone(),
                config.retry,
            ))
        }
        (HandlerMode::Detect, None) => anyhow::bail!("Detect mode resolved without detection settings"),
    };
    info!(mode = ?config.mode, "Message handler ready");

    let state = AppState::new(handler, &config.telegram_token);
    let tasks = state.tasks.clone();
    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(config.listen)
        .await
        .with_context(|| format!("Failed to bind to {}", config.listen))?;
    info!("Listening on http://{}", config.listen);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    tasks.close();
    if tokio::time::timeout(DRAIN_TIMEOUT, tasks.wait()).await.is_err() {
        warn!(pending = tasks.len(), "Shutdown with updates still in flight");
    }
    info!("Shutdown complete");
    Ok(())
}
