//! HTTP API handlers for sightbot-gateway

pub mod health;
pub mod webhook;

pub use health::health_routes;
pub use webhook::webhook_routes;
