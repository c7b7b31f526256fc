//! Prediction store
//!
//! Append-only: each request writes exactly one document keyed by its
//! prediction id. A second write with the same id fails instead of replacing
//! the first.

use async_trait::async_trait;
use sightbot_common::{CorrelationId, Error, PersistedPrediction, Result};
use sqlx::SqlitePool;

/// Durable home of prediction summaries
#[async_trait]
pub trait PredictionStore: Send + Sync {
    /// Persist one summary document.
    ///
    /// # Errors
    /// `Error::Persistence` if the document could not be stored
    async fn save(&self, record: &PersistedPrediction) -> Result<()>;

    /// Look up a stored document by prediction id
    async fn find(&self, prediction_id: &CorrelationId) -> Result<Option<PersistedPrediction>>;
}

/// SQLite-backed prediction store
#[derive(Debug, Clone)]
pub struct SqlitePredictionStore {
    pool: SqlitePool,
}

impl SqlitePredictionStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl PredictionStore for SqlitePredictionStore {
    async fn save(&self, record: &PersistedPrediction) -> Result<()> {
        let document = serde_json::to_string(record)
            .map_err(|e| Error::Persistence(format!("serialize failed: {}", e)))?;

        sqlx::query(
            "INSERT INTO prediction_summaries (prediction_id, img_name, document, created_at) VALUES (?, ?, ?, ?)",
        )
        .bind(record.predictions.prediction_id.to_string())
        .bind(&record.img_name)
        .bind(document)
        .bind(record.predictions.created_at.to_rfc3339())
        .execute(&self.pool)
        .await
        .map_err(|e| Error::Persistence(e.to_string()))?;

        Ok(())
    }

    async fn find(&self, prediction_id: &CorrelationId) -> Result<Option<PersistedPrediction>> {
        let row: Option<(String,)> =
            sqlx::query_as("SELECT document FROM prediction_summaries WHERE prediction_id = ?")
                .bind(prediction_id.to_string())
                .fetch_optional(&self.pool)
                .await
                .map_err(|e| Error::Persistence(e.to_string()))?;

        row.map(|(document,)| {
            serde_json::from_str(&document)
                .map_err(|e| Error::Persistence(format!("stored document is corrupt: {}", e)))
        })
        .transpose()
    }
}
