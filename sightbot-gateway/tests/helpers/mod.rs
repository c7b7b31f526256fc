//! Test helpers for sightbot-gateway
//!
//! A recording chat transport and an inference fake that reads the image back
//! out of the object store, so a test sees exactly what the gateway uploaded.
//! [`LogCapture`] collects formatted log lines for tests that check logging.

#![allow(dead_code)]

use async_trait::async_trait;
use sightbot_common::object_store::{FsObjectStore, ObjectStore};
use sightbot_common::{
    ChatPhotoEvent, CorrelationId, DetectionLabel, Error, PhotoVariant, PredictionSummary, Result,
    RetryPolicy, StoredImageKey,
};
use sightbot_gateway::inference_client::InferenceClient;
use sightbot_gateway::transport::ChatTransport;
use sightbot_gateway::IngestionGateway;
use std::collections::HashMap;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tempfile::TempDir;

/// A message the gateway sent
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentMessage {
    pub chat_id: i64,
    pub text: String,
    pub quoted_message_id: Option<i64>,
}

/// Chat transport serving files from memory and recording replies
#[derive(Default)]
pub struct FakeTransport {
    files: HashMap<String, Vec<u8>>,
    fail_fetch: bool,
    fetches: Mutex<Vec<String>>,
    sent: Mutex<Vec<SentMessage>>,
}

impl FakeTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_file(mut self, file_id: &str, bytes: &[u8]) -> Self {
        self.files.insert(file_id.to_string(), bytes.to_vec());
        self
    }

    pub fn failing_fetch() -> Self {
        Self {
            fail_fetch: true,
            ..Self::default()
        }
    }

    pub fn sent(&self) -> Vec<SentMessage> {
        self.sent.lock().unwrap().clone()
    }

    pub fn fetched(&self) -> Vec<String> {
        self.fetches.lock().unwrap().clone()
    }
}

#[async_trait]
impl ChatTransport for FakeTransport {
    async fn fetch_file(&self, file_id: &str) -> Result<Vec<u8>> {
        self.fetches.lock().unwrap().push(file_id.to_string());
        if self.fail_fetch {
            return Err(Error::TransportFetch("getFile rejected (400 Bad Request)".to_string()));
        }
        self.files
            .get(file_id)
            .cloned()
            .ok_or_else(|| Error::TransportFetch(format!("unknown file {}", file_id)))
    }

    async fn send_text(&self, chat_id: i64, text: &str) -> Result<()> {
        self.sent.lock().unwrap().push(SentMessage {
            chat_id,
            text: text.to_string(),
            quoted_message_id: None,
        });
        Ok(())
    }

    async fn send_text_with_quote(&self, chat_id: i64, text: &str, quoted_message_id: i64) -> Result<()> {
        self.sent.lock().unwrap().push(SentMessage {
            chat_id,
            text: text.to_string(),
            quoted_message_id: Some(quoted_message_id),
        });
        Ok(())
    }
}

/// Inference fake that downloads the image from its own store first.
///
/// A key missing from that store fails with `ImageNotFound`, as the real
/// detection service does.
pub struct StoreBackedInference {
    store: Arc<dyn ObjectStore>,
    scratch: PathBuf,
    classes: Vec<String>,
    calls: AtomicUsize,
}

impl StoreBackedInference {
    pub fn new(store: Arc<dyn ObjectStore>, scratch: PathBuf, classes: &[&str]) -> Self {
        Self {
            store,
            scratch,
            classes: classes.iter().map(|c| c.to_string()).collect(),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl InferenceClient for StoreBackedInference {
    async fn predict(&self, key: &StoredImageKey) -> Result<PredictionSummary> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        let id = CorrelationId::new();
        let local = self.scratch.join(id.to_string());
        self.store.download(key, &local).await?;
        tokio::fs::remove_file(&local).await?;

        Ok(summary(id, key, &self.classes))
    }
}

/// Inference fake that always fails with the error built by `make_error`
pub struct FailingInference {
    make_error: fn() -> Error,
}

impl FailingInference {
    pub fn new(make_error: fn() -> Error) -> Self {
        Self { make_error }
    }
}

#[async_trait]
impl InferenceClient for FailingInference {
    async fn predict(&self, _key: &StoredImageKey) -> Result<PredictionSummary> {
        Err((self.make_error)())
    }
}

pub fn summary(id: CorrelationId, key: &StoredImageKey, classes: &[String]) -> PredictionSummary {
    PredictionSummary {
        prediction_id: id,
        original_image_key: key.clone(),
        annotated_image_key: key.annotated(),
        labels: classes
            .iter()
            .map(|class_name| DetectionLabel {
                class_name: class_name.clone(),
                center_x: 0.5,
                center_y: 0.5,
                width: 0.2,
                height: 0.2,
            })
            .collect(),
        created_at: chrono::Utc::now(),
    }
}

/// Photo message with small, medium and large variants of `unique_id`
pub fn photo_event(chat_id: i64, unique_id: &str) -> ChatPhotoEvent {
    let variant = |size: &str, width: u32| PhotoVariant {
        file_id: format!("{}-{}", unique_id, size),
        file_unique_id: if size == "large" {
            unique_id.to_string()
        } else {
            format!("{}-{}", unique_id, size)
        },
        width,
        height: width * 3 / 4,
        file_size: None,
    };

    ChatPhotoEvent {
        chat_id,
        message_id: 100,
        text: None,
        photo_variants: vec![variant("small", 90), variant("medium", 320), variant("large", 1280)],
    }
}

pub fn text_event(chat_id: i64, message_id: i64, text: &str) -> ChatPhotoEvent {
    ChatPhotoEvent {
        chat_id,
        message_id,
        text: Some(text.to_string()),
        photo_variants: Vec::new(),
    }
}

/// Gateway wired to temp-dir resources
pub struct TestGateway {
    pub dir: TempDir,
    pub transport: Arc<FakeTransport>,
    pub store: Arc<FsObjectStore>,
    pub gateway: IngestionGateway,
}

impl TestGateway {
    pub fn new(transport: FakeTransport, inference: Arc<dyn InferenceClient>) -> Self {
        let dir = TempDir::new().unwrap();
        let store = Arc::new(FsObjectStore::new(dir.path().join("bucket")).unwrap());
        Self::with_store(dir, store, transport, inference)
    }

    pub fn with_store(
        dir: TempDir,
        store: Arc<FsObjectStore>,
        transport: FakeTransport,
        inference: Arc<dyn InferenceClient>,
    ) -> Self {
        let transport = Arc::new(transport);
        let gateway = IngestionGateway::new(
            transport.clone(),
            store.clone(),
            inference,
            dir.path().join("photos"),
            RetryPolicy::none(),
        );

        Self {
            dir,
            transport,
            store,
            gateway,
        }
    }

    pub fn photos_dir(&self) -> PathBuf {
        self.dir.path().join("photos")
    }

    /// Read a blob straight from the bucket directory
    pub fn read_blob(&self, key: &str) -> Option<Vec<u8>> {
        std::fs::read(self.store.blob_path(&StoredImageKey::new(key)).unwrap()).ok()
    }
}

/// Object store that waits before every upload
pub struct SlowStore {
    inner: Arc<FsObjectStore>,
    delay: Duration,
}

impl SlowStore {
    pub fn new(inner: Arc<FsObjectStore>, delay: Duration) -> Self {
        Self { inner, delay }
    }
}

#[async_trait]
impl ObjectStore for SlowStore {
    async fn upload(&self, local_path: &Path, key: &StoredImageKey) -> Result<()> {
        tokio::time::sleep(self.delay).await;
        self.inner.upload(local_path, key).await
    }

    async fn download(&self, key: &StoredImageKey, local_path: &Path) -> Result<()> {
        self.inner.download(key, local_path).await
    }
}

/// Formatted log output of the current thread while installed
#[derive(Clone, Default)]
pub struct LogCapture(Arc<Mutex<Vec<u8>>>);

impl LogCapture {
    pub fn install(&self) -> tracing::subscriber::DefaultGuard {
        let writer = self.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_ansi(false)
            .with_max_level(tracing::Level::DEBUG)
            .with_writer(move || writer.clone())
            .finish();
        tracing::subscriber::set_default(subscriber)
    }

    pub fn lines(&self) -> Vec<String> {
        String::from_utf8_lossy(&self.0.lock().unwrap())
            .lines()
            .map(str::to_string)
            .collect()
    }
}

impl Write for LogCapture {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}
