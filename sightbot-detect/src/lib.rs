//! sightbot-detect library interface
//!
//! Exposes the inference pipeline and HTTP router for the binary and for
//! integration tests.

pub mod api;
pub mod config;
pub mod db;
pub mod error;
pub mod services;

pub use crate::error::{ApiError, ApiResult};

use axum::Router;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use crate::db::PredictionStore;
use crate::services::InferenceOrchestrator;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    /// Inference pipeline, built once at startup
    pub orchestrator: Arc<InferenceOrchestrator>,
    /// Prediction store, for lookups by id
    pub predictions: Arc<dyn PredictionStore>,
    /// Service startup timestamp for uptime tracking
    pub startup_time: DateTime<Utc>,
}

impl AppState {
    pub fn new(orchestrator: Arc<InferenceOrchestrator>, predictions: Arc<dyn PredictionStore>) -> Self {
        Self {
            orchestrator,
            predictions,
            startup_time: Utc::now(),
        }
    }
}

/// Build application router
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .merge(api::predict_routes())
        .merge(api::health_routes())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
