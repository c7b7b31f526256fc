//! Webhook endpoint
//!
//! Telegram posts each update to `POST /<token>/`. The update is handed to
//! the configured handler on its own task and acknowledged at once, so a slow
//! inference never holds up delivery of other updates.

use axum::{
    body::Bytes,
    extract::{Path, State},
    http::StatusCode,
    routing::post,
    Router,
};
use tracing::{debug, warn};

use crate::transport::Update;
use crate::AppState;

/// POST /:token/
pub async fn receive_update(
    State(state): State<AppState>,
    Path(token): Path<String>,
    body: Bytes,
) -> StatusCode {
    if token.as_str() != &*state.telegram_token {
        warn!("Webhook call with unknown token rejected");
        return StatusCode::NOT_FOUND;
    }

    // Decoded only once the token matched, so unknown paths all look alike
    let update: Update = match serde_json::from_slice(&body) {
        Ok(update) => update,
        Err(e) => {
            warn!(error = %e, "Malformed update rejected");
            return StatusCode::BAD_REQUEST;
        }
    };

    let update_id = update.update_id;
    let Some(event) = update.into_event() else {
        debug!(update_id, "Update carries no message, ignoring");
        return StatusCode::OK;
    };

    debug!(update_id, chat_id = event.chat_id, photo = event.is_photo(), "Incoming message");

    let handler = state.handler.clone();
    state.tasks.spawn(async move {
        handler.handle(event).await;
    });

    StatusCode::OK
}

/// Build webhook routes
pub fn webhook_routes() -> Router<AppState> {
    Router::new().route("/:token/", post(receive_update))
}
