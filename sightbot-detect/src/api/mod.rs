//! HTTP API handlers for sightbot-detect

pub mod health;
pub mod predict;

pub use health::health_routes;
pub use predict::{predict_routes, PERSISTENCE_WARNING_HEADER};
