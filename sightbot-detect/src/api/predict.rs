//! Prediction endpoints
//!
//! `POST /predict?imgName=<key>` (or JSON body `{"imgName": "<key>"}`) runs the
//! inference pipeline and returns the prediction summary.

use axum::{
    body::Bytes,
    extract::{Path, Query, State},
    http::HeaderValue,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use sightbot_common::{CorrelationId, PersistedPrediction, StoredImageKey};

use crate::error::{ApiError, ApiResult};
use crate::AppState;

/// Header set on a 200 response whose summary could not be persisted
pub const PERSISTENCE_WARNING_HEADER: &str = "x-persistence-warning";

#[derive(Debug, Default, Deserialize)]
pub struct PredictParams {
    #[serde(rename = "imgName")]
    pub img_name: Option<String>,
}

/// Image name from the query string, falling back to a JSON body
fn resolve_img_name(query: PredictParams, body: &Bytes) -> ApiResult<String> {
    if let Some(name) = query.img_name.filter(|n| !n.trim().is_empty()) {
        return Ok(name);
    }

    if !body.is_empty() {
        let parsed: PredictParams = serde_json::from_slice(body)
            .map_err(|e| ApiError::BadRequest(format!("invalid JSON body: {}", e)))?;
        if let Some(name) = parsed.img_name.filter(|n| !n.trim().is_empty()) {
            return Ok(name);
        }
    }

    Err(ApiError::BadRequest("imgName is required".to_string()))
}

/// POST /predict
///
/// The pipeline runs on its own task: if the caller gives up and drops the
/// connection, detection still finishes and the summary is still persisted.
pub async fn predict(
    State(state): State<AppState>,
    Query(params): Query<PredictParams>,
    body: Bytes,
) -> ApiResult<Response> {
    let key = StoredImageKey::new(resolve_img_name(params, &body)?);

    let orchestrator = state.orchestrator.clone();
    let task_key = key.clone();
    let outcome = tokio::spawn(async move { orchestrator.infer(&task_key).await })
        .await
        .map_err(|e| ApiError::Internal(format!("inference task failed: {}", e)))?
        .map_err(|e| {
            tracing::error!(key = %key, code = e.code(), error = %e, "Prediction failed");
            ApiError::from(e)
        })?;

    let mut response = Json(&outcome.summary).into_response();
    if let Some(err) = &outcome.persistence_error {
        response
            .headers_mut()
            .insert(PERSISTENCE_WARNING_HEADER, HeaderValue::from_static(err.code()));
    }
    Ok(response)
}

/// GET /predictions/:id
pub async fn get_prediction(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<PersistedPrediction>> {
    let prediction_id: CorrelationId = id
        .parse()
        .map_err(|_| ApiError::BadRequest(format!("invalid prediction id: {}", id)))?;

    state
        .predictions
        .find(&prediction_id)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(format!("prediction {}", prediction_id)))
}

/// Build prediction routes
pub fn predict_routes() -> Router<AppState> {
    Router::new()
        .route("/predict", post(predict))
        .route("/predictions/:id", get(get_prediction))
}
