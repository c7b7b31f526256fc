//! Ingestion gateway
//!
//! Turns one chat photo into one chat reply:
//! fetch → stage locally → upload → infer → format → reply.
//!
//! Every failure between fetch and format is answered with [`GENERIC_ERROR`];
//! the cause only ever goes to the log.

use async_trait::async_trait;
use sightbot_common::format::format_prediction;
use sightbot_common::object_store::ObjectStore;
use sightbot_common::retry::retry_transient;
use sightbot_common::{ChatPhotoEvent, CorrelationId, PhotoVariant, Result, RetryPolicy, StoredImageKey};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{error, info, warn};

use crate::handlers::MessageHandler;
use crate::inference_client::InferenceClient;
use crate::transport::ChatTransport;

/// Reply sent for any failed photo request
pub const GENERIC_ERROR: &str = "An error occurred while processing your request. Please try again later.";

pub struct IngestionGateway {
    transport: Arc<dyn ChatTransport>,
    store: Arc<dyn ObjectStore>,
    inference: Arc<dyn InferenceClient>,
    photos_dir: PathBuf,
    retry: RetryPolicy,
}

impl IngestionGateway {
    pub fn new(
        transport: Arc<dyn ChatTransport>,
        store: Arc<dyn ObjectStore>,
        inference: Arc<dyn InferenceClient>,
        photos_dir: PathBuf,
        retry: RetryPolicy,
    ) -> Self {
        Self {
            transport,
            store,
            inference,
            photos_dir,
            retry,
        }
    }

    /// Run the photo pipeline for the largest variant and produce the reply text
    async fn process(&self, event: &ChatPhotoEvent, photo: &PhotoVariant, key: &StoredImageKey) -> Result<String> {
        let transport = &self.transport;
        let file_id = photo.file_id.as_str();
        let bytes = retry_transient("photo fetch", self.retry, move || transport.fetch_file(file_id)).await?;

        self.upload(key, &bytes).await?;
        info!(chat_id = event.chat_id, key = %key, "Photo uploaded");

        let inference = &self.inference;
        let summary = retry_transient("inference request", self.retry, move || inference.predict(key)).await?;

        info!(
            chat_id = event.chat_id,
            key = %key,
            prediction_id = %summary.prediction_id,
            labels = summary.labels.len(),
            "Prediction received"
        );
        Ok(format_prediction(&summary.labels))
    }

    /// Stage the photo in `photos_dir` and upload it under `key`.
    ///
    /// The staged file name is unique per request, since the same photo can
    /// arrive in several events at once. It is removed once the upload has
    /// finished, whatever the outcome.
    async fn upload(&self, key: &StoredImageKey, bytes: &[u8]) -> Result<()> {
        tokio::fs::create_dir_all(&self.photos_dir).await?;
        let local_path = self
            .photos_dir
            .join(format!("{}-{}", CorrelationId::new(), key.file_name()));
        tokio::fs::write(&local_path, bytes).await?;

        let store = &self.store;
        let local = local_path.as_path();
        let uploaded = retry_transient("object store upload", self.retry, move || store.upload(local, key)).await;

        remove_local(&local_path).await;
        uploaded
    }
}

async fn remove_local(path: &Path) {
    if let Err(e) = tokio::fs::remove_file(path).await {
        warn!(path = %path.display(), error = %e, "Failed to remove local photo");
    }
}

#[async_trait]
impl MessageHandler for IngestionGateway {
    async fn handle(&self, event: ChatPhotoEvent) {
        let Some(photo) = event.largest_photo() else {
            info!(chat_id = event.chat_id, "Message is not a photo, ignoring");
            return;
        };
        let key = StoredImageKey::for_photo(&photo.file_unique_id);

        let reply = match self.process(&event, photo, &key).await {
            Ok(text) => text,
            Err(e) => {
                error!(
                    chat_id = event.chat_id,
                    key = %key,
                    code = e.code(),
                    error = %e,
                    "Photo request failed"
                );
                GENERIC_ERROR.to_string()
            }
        };

        if let Err(e) = self.transport.send_text(event.chat_id, &reply).await {
            error!(chat_id = event.chat_id, error = %e, "Failed to send reply");
        }
    }
}
