//! Inference orchestrator
//!
//! Runs one request through download → detect → upload annotated image →
//! parse labels → persist summary. Each request works inside its own
//! [`WorkArea`], so concurrent requests never touch each other's files.

use sightbot_common::labels::parse_label_file;
use sightbot_common::object_store::ObjectStore;
use sightbot_common::retry::retry_transient;
use sightbot_common::{
    ClassNames, CorrelationId, Error, PersistedPrediction, PredictionSummary, Result, RetryPolicy,
    StoredImageKey,
};
use std::path::PathBuf;
use std::sync::Arc;

use super::runner::{DetectionOutputs, DetectionRunner};
use super::work_area::WorkArea;
use crate::db::PredictionStore;

/// Result of a successful inference
#[derive(Debug)]
pub struct InferenceOutcome {
    pub summary: PredictionSummary,
    /// Label lines that were dropped as malformed
    pub dropped_lines: usize,
    /// Set when the summary could not be persisted; the summary is still valid
    pub persistence_error: Option<Error>,
}

pub struct InferenceOrchestrator {
    store: Arc<dyn ObjectStore>,
    runner: Arc<dyn DetectionRunner>,
    predictions: Arc<dyn PredictionStore>,
    class_names: ClassNames,
    work_root: PathBuf,
    retry: RetryPolicy,
}

impl InferenceOrchestrator {
    pub fn new(
        store: Arc<dyn ObjectStore>,
        runner: Arc<dyn DetectionRunner>,
        predictions: Arc<dyn PredictionStore>,
        class_names: ClassNames,
        work_root: PathBuf,
        retry: RetryPolicy,
    ) -> Self {
        Self {
            store,
            runner,
            predictions,
            class_names,
            work_root,
            retry,
        }
    }

    /// Run detection on the image stored under `image_key`.
    ///
    /// # Errors
    /// - `Error::InvalidInput` if the key cannot name a local file
    /// - `Error::ImageNotFound` if the key does not exist in the object store
    /// - `Error::DetectionFailure` if the detector failed or wrote no annotated image
    /// - `Error::StoreRead` / `Error::StoreWrite` after retries are exhausted
    ///
    /// A persistence failure does not fail the call; it is reported in
    /// [`InferenceOutcome::persistence_error`].
    pub async fn infer(&self, image_key: &StoredImageKey) -> Result<InferenceOutcome> {
        image_key.validate()?;

        let prediction_id = CorrelationId::new();
        tracing::info!(prediction_id = %prediction_id, key = %image_key, "Start processing");

        let work = WorkArea::create(&self.work_root, &prediction_id).await?;
        let outcome = self.infer_in(&work, prediction_id, image_key).await;
        work.remove().await;
        outcome
    }

    async fn infer_in(
        &self,
        work: &WorkArea,
        prediction_id: CorrelationId,
        image_key: &StoredImageKey,
    ) -> Result<InferenceOutcome> {
        let source = work.input_path(image_key);
        let source_path = source.as_path();

        retry_transient("object store download", self.retry, move || {
            self.store.download(image_key, source_path)
        })
        .await
        .inspect_err(|e| {
            tracing::error!(prediction_id = %prediction_id, key = %image_key, error = %e, "Download failed")
        })?;
        tracing::info!(prediction_id = %prediction_id, key = %image_key, "Download img completed");

        let output_dir = work.output_dir();
        self.runner.run(&source, &output_dir).await?;
        tracing::info!(prediction_id = %prediction_id, key = %image_key, "Detection done");

        let outputs = DetectionOutputs::locate(&source, &output_dir);
        if !outputs.annotated_image.exists() {
            return Err(Error::DetectionFailure(format!(
                "annotated image missing at {}",
                outputs.annotated_image.display()
            )));
        }

        let annotated_key = image_key.annotated();
        let annotated_path = outputs.annotated_image.as_path();
        let upload_key = &annotated_key;
        retry_transient("object store upload", self.retry, move || {
            self.store.upload(annotated_path, upload_key)
        })
        .await?;
        tracing::debug!(prediction_id = %prediction_id, key = %annotated_key, "Annotated image uploaded");

        let (labels, dropped) = match tokio::fs::read_to_string(&outputs.label_file).await {
            Ok(content) => parse_label_file(&content, &self.class_names),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::info!(prediction_id = %prediction_id, "No label file; nothing detected");
                (Vec::new(), Vec::new())
            }
            Err(e) => return Err(e.into()),
        };
        for err in &dropped {
            tracing::warn!(prediction_id = %prediction_id, error = %err, "Dropping malformed label line");
        }

        let summary = PredictionSummary {
            prediction_id,
            original_image_key: image_key.clone(),
            annotated_image_key: annotated_key,
            labels,
            created_at: sightbot_common::time::now(),
        };
        tracing::info!(
            prediction_id = %prediction_id,
            labels = summary.labels.len(),
            dropped = dropped.len(),
            "Prediction summary ready"
        );

        let persistence_error = match self.predictions.save(&PersistedPrediction::from(&summary)).await {
            Ok(()) => None,
            Err(e) => {
                tracing::warn!(prediction_id = %prediction_id, error = %e, "Prediction summary not persisted");
                Some(e)
            }
        };

        Ok(InferenceOutcome {
            summary,
            dropped_lines: dropped.len(),
            persistence_error,
        })
    }
}
