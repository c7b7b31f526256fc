//! Test helpers for sightbot-detect
//!
//! Fakes for the detector and the prediction store, plus a builder that wires
//! an orchestrator to a filesystem object store inside a temp directory.

#![allow(dead_code)]

use async_trait::async_trait;
use sightbot_common::object_store::{FsObjectStore, ObjectStore};
use sightbot_common::{
    ClassNames, CorrelationId, Error, PersistedPrediction, Result, RetryPolicy, StoredImageKey,
};
use sightbot_detect::db::{self, PredictionStore, SqlitePredictionStore};
use sightbot_detect::services::{DetectionOutputs, DetectionRunner, InferenceOrchestrator};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tempfile::TempDir;

/// What the fake detector writes
#[derive(Debug, Clone)]
pub enum FakeBehavior {
    /// Annotated image plus these label lines
    Labels(Vec<String>),
    /// Annotated image, no label file
    NothingDetected,
    /// Exit "successfully" without writing anything
    NoOutput,
    /// Fail outright
    Crash,
    /// Labels derived from the image bytes: content `img-<n>` yields class `n % 3`
    FromImageContent,
}

pub struct FakeRunner {
    behavior: FakeBehavior,
    delay: Duration,
}

impl FakeRunner {
    pub fn new(behavior: FakeBehavior) -> Self {
        Self {
            behavior,
            delay: Duration::ZERO,
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }
}

#[async_trait]
impl DetectionRunner for FakeRunner {
    async fn run(&self, source: &Path, output_dir: &Path) -> Result<()> {
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }

        let outputs = DetectionOutputs::locate(source, output_dir);
        let image = tokio::fs::read(source).await?;

        match &self.behavior {
            FakeBehavior::Labels(lines) => {
                write_annotated(&outputs, &image).await?;
                write_labels(&outputs, lines).await?;
            }
            FakeBehavior::NothingDetected => write_annotated(&outputs, &image).await?,
            FakeBehavior::NoOutput => {}
            FakeBehavior::Crash => {
                return Err(Error::DetectionFailure("detector crashed".to_string()));
            }
            FakeBehavior::FromImageContent => {
                let text = String::from_utf8_lossy(&image).to_string();
                let n: usize = text.trim_start_matches("img-").parse().unwrap_or(0);
                write_annotated(&outputs, &image).await?;
                write_labels(&outputs, &[format!("{} 0.5 0.5 0.1 0.1", n % 3)]).await?;
            }
        }
        Ok(())
    }
}

async fn write_annotated(outputs: &DetectionOutputs, image: &[u8]) -> std::io::Result<()> {
    if let Some(dir) = outputs.annotated_image.parent() {
        tokio::fs::create_dir_all(dir).await?;
    }
    let mut annotated = b"annotated:".to_vec();
    annotated.extend_from_slice(image);
    tokio::fs::write(&outputs.annotated_image, annotated).await
}

async fn write_labels(outputs: &DetectionOutputs, lines: &[String]) -> std::io::Result<()> {
    if let Some(dir) = outputs.label_file.parent() {
        tokio::fs::create_dir_all(dir).await?;
    }
    tokio::fs::write(&outputs.label_file, lines.join("\n")).await
}

/// Prediction store whose writes always fail
pub struct FailingPredictionStore;

#[async_trait]
impl PredictionStore for FailingPredictionStore {
    async fn save(&self, _record: &PersistedPrediction) -> Result<()> {
        Err(Error::Persistence("database unavailable".to_string()))
    }

    async fn find(&self, _id: &CorrelationId) -> Result<Option<PersistedPrediction>> {
        Ok(None)
    }
}

/// SQLite prediction store that also remembers the ids it saved
pub struct RecordingPredictionStore {
    inner: SqlitePredictionStore,
    saved: Mutex<Vec<CorrelationId>>,
}

impl RecordingPredictionStore {
    pub async fn new() -> Self {
        let pool = db::init_database_pool("sqlite::memory:").await.unwrap();
        Self {
            inner: SqlitePredictionStore::new(pool),
            saved: Mutex::new(Vec::new()),
        }
    }

    pub fn saved(&self) -> Vec<CorrelationId> {
        self.saved.lock().unwrap().clone()
    }
}

#[async_trait]
impl PredictionStore for RecordingPredictionStore {
    async fn save(&self, record: &PersistedPrediction) -> Result<()> {
        self.inner.save(record).await?;
        self.saved.lock().unwrap().push(record.predictions.prediction_id);
        Ok(())
    }

    async fn find(&self, id: &CorrelationId) -> Result<Option<PersistedPrediction>> {
        self.inner.find(id).await
    }
}

pub fn class_names() -> ClassNames {
    ClassNames::new(vec!["person".into(), "bicycle".into(), "car".into()])
}

/// Orchestrator wired to temp-dir resources
pub struct TestPipeline {
    pub dir: TempDir,
    pub store: Arc<FsObjectStore>,
    pub predictions: Arc<dyn PredictionStore>,
    pub orchestrator: Arc<InferenceOrchestrator>,
}

impl TestPipeline {
    pub async fn new(runner: FakeRunner) -> Self {
        let pool = db::init_database_pool("sqlite::memory:").await.unwrap();
        Self::with_predictions(runner, Arc::new(SqlitePredictionStore::new(pool))).await
    }

    pub async fn with_predictions(runner: FakeRunner, predictions: Arc<dyn PredictionStore>) -> Self {
        let dir = TempDir::new().unwrap();
        let store = Arc::new(FsObjectStore::new(dir.path().join("bucket")).unwrap());
        let work_root = dir.path().join("work");
        std::fs::create_dir_all(&work_root).unwrap();

        let orchestrator = Arc::new(InferenceOrchestrator::new(
            store.clone(),
            Arc::new(runner),
            predictions.clone(),
            class_names(),
            work_root,
            RetryPolicy::none(),
        ));

        Self {
            dir,
            store,
            predictions,
            orchestrator,
        }
    }

    pub fn work_root(&self) -> PathBuf {
        self.dir.path().join("work")
    }

    /// Put an image into the bucket under `key`
    pub async fn seed_image(&self, key: &str, content: &[u8]) -> StoredImageKey {
        let local = self.dir.path().join(format!("seed-{}", key.replace('/', "_")));
        std::fs::write(&local, content).unwrap();
        let key = StoredImageKey::new(key);
        self.store.upload(&local, &key).await.unwrap();
        std::fs::remove_file(&local).unwrap();
        key
    }

    /// Read a blob straight from the bucket directory
    pub fn read_blob(&self, key: &StoredImageKey) -> Option<Vec<u8>> {
        std::fs::read(self.store.blob_path(key).unwrap()).ok()
    }

    /// Entries left in the work root
    pub fn leftover_work_dirs(&self) -> usize {
        std::fs::read_dir(self.work_root()).unwrap().count()
    }
}
