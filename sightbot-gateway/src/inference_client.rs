//! Client for the detection service
//!
//! `POST <YOLO_URL>/predict?imgName=<key>` returns a prediction summary. The
//! whole exchange, body included, runs under one explicit timeout.

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use sightbot_common::{Error, PredictionSummary, Result, StoredImageKey};
use std::time::Duration;
use tracing::debug;

#[async_trait]
pub trait InferenceClient: Send + Sync {
    /// Run inference on an image already uploaded under `key`
    async fn predict(&self, key: &StoredImageKey) -> Result<PredictionSummary>;
}

/// Error body returned by the detection service
#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: ErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ErrorDetail {
    code: String,
    message: String,
}

pub struct HttpInferenceClient {
    http_client: Client,
    predict_url: String,
    timeout: Duration,
}

impl HttpInferenceClient {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let http_client = Client::builder()
            .build()
            .map_err(|e| Error::Config(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            http_client,
            predict_url: format!("{}/predict", base_url.trim_end_matches('/')),
            timeout,
        })
    }

    async fn request(&self, key: &StoredImageKey) -> Result<PredictionSummary> {
        let response = self
            .http_client
            .post(&self.predict_url)
            .query(&[("imgName", key.as_str())])
            .send()
            .await
            .map_err(|e| Error::InferenceService {
                message: format!("request failed: {}", e),
                transient: e.is_connect(),
            })?;

        let status = response.status();
        if status != StatusCode::OK {
            let body = response.text().await.unwrap_or_default();
            return Err(status_error(status, &body, key));
        }

        if let Some(warning) = response.headers().get("x-persistence-warning") {
            tracing::warn!(key = %key, warning = ?warning, "Detection service could not persist the prediction");
        }

        response
            .json::<PredictionSummary>()
            .await
            .map_err(|e| Error::InferenceService {
                message: format!("undecodable prediction: {}", e),
                transient: false,
            })
    }
}

/// Map a non-200 answer to the error taxonomy.
///
/// A 404 carrying `IMAGE_NOT_FOUND` keeps its identity so the gateway log
/// names the missing key; every other status is a terminal service failure.
fn status_error(status: StatusCode, body: &str, key: &StoredImageKey) -> Error {
    match serde_json::from_str::<ErrorBody>(body) {
        Ok(parsed) if status == StatusCode::NOT_FOUND && parsed.error.code == "IMAGE_NOT_FOUND" => {
            Error::ImageNotFound {
                key: key.to_string(),
            }
        }
        Ok(parsed) => Error::InferenceService {
            message: format!("{} {}: {}", status, parsed.error.code, parsed.error.message),
            transient: false,
        },
        Err(_) => Error::InferenceService {
            message: format!("{}: {}", status, body.chars().take(200).collect::<String>()),
            transient: false,
        },
    }
}

#[async_trait]
impl InferenceClient for HttpInferenceClient {
    async fn predict(&self, key: &StoredImageKey) -> Result<PredictionSummary> {
        debug!(key = %key, url = %self.predict_url, "Requesting prediction");

        tokio::time::timeout(self.timeout, self.request(key))
            .await
            .map_err(|_| Error::InferenceTimeout(self.timeout))?
    }
}
