//! sightbot-gateway library interface
//!
//! Chat webhook ingestion: decodes updates, dispatches them to the configured
//! message handler and, in detect mode, relays photos to the detection service.

pub mod api;
pub mod config;
pub mod gateway;
pub mod handlers;
pub mod inference_client;
pub mod transport;

pub use crate::gateway::{IngestionGateway, GENERIC_ERROR};
pub use crate::handlers::{EchoHandler, HandlerMode, MessageHandler, QuoteHandler};

use axum::Router;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tokio_util::task::TaskTracker;
use tower_http::trace::TraceLayer;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    /// Strategy every inbound message is dispatched to
    pub handler: Arc<dyn MessageHandler>,
    /// Webhook path secret; calls on any other path are rejected
    pub telegram_token: Arc<str>,
    /// In-flight update tasks, drained on shutdown
    pub tasks: TaskTracker,
    /// Service startup timestamp for uptime tracking
    pub startup_time: DateTime<Utc>,
}

impl AppState {
    pub fn new(handler: Arc<dyn MessageHandler>, telegram_token: &str) -> Self {
        Self {
            handler,
            telegram_token: telegram_token.into(),
            tasks: TaskTracker::new(),
            startup_time: Utc::now(),
        }
    }
}

/// Build application router
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .merge(api::webhook_routes())
        .merge(api::health_routes())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
