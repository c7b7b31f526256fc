//! Object store client
//!
//! One interface for moving image blobs between local files and the bucket.
//! Both services build their client once at startup through
//! [`connect_object_store`] and share it across every request.

use async_trait::async_trait;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::types::StoredImageKey;
use crate::{Error, Result};

mod fs;
#[cfg(feature = "s3")]
mod s3;

pub use fs::FsObjectStore;
#[cfg(feature = "s3")]
pub use s3::S3ObjectStore;

/// Blob storage keyed by [`StoredImageKey`]
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Upload a local file under `key`, replacing any existing blob.
    ///
    /// # Errors
    /// `Error::StoreWrite` if the blob could not be written
    async fn upload(&self, local_path: &Path, key: &StoredImageKey) -> Result<()>;

    /// Download the blob under `key` into `local_path`.
    ///
    /// # Errors
    /// `Error::ImageNotFound` if no blob exists under `key`,
    /// `Error::StoreRead` for any other failure
    async fn download(&self, key: &StoredImageKey, local_path: &Path) -> Result<()>;
}

/// Which object store implementation to build
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    /// Amazon S3 or an S3-compatible endpoint
    #[default]
    S3,
    /// A local directory acting as the bucket
    Fs,
}

impl std::str::FromStr for StoreBackend {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "s3" => Ok(StoreBackend::S3),
            "fs" => Ok(StoreBackend::Fs),
            other => Err(Error::Config(format!("Unknown object store backend: {}", other))),
        }
    }
}

/// Object store settings shared by both services
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectStoreConfig {
    pub backend: StoreBackend,
    pub bucket: String,
    pub region: Option<String>,
    /// Custom S3 endpoint (MinIO, LocalStack); uses path-style addressing
    pub endpoint_url: Option<String>,
    /// Parent directory of the bucket for the `fs` backend
    pub fs_root: PathBuf,
}

/// Build the process-wide object store client
pub async fn connect_object_store(config: &ObjectStoreConfig) -> Result<Arc<dyn ObjectStore>> {
    if config.bucket.trim().is_empty() {
        return Err(Error::Config("Bucket name must not be empty".to_string()));
    }

    match config.backend {
        StoreBackend::Fs => {
            let store = FsObjectStore::new(config.fs_root.join(&config.bucket))?;
            tracing::info!(bucket = %config.bucket, root = %config.fs_root.display(), "Using filesystem object store");
            Ok(Arc::new(store))
        }
        #[cfg(feature = "s3")]
        StoreBackend::S3 => {
            let region = config
                .region
                .clone()
                .ok_or_else(|| Error::Config("REGION is required for the s3 backend".to_string()))?;
            let store = S3ObjectStore::connect(&config.bucket, region, config.endpoint_url.clone()).await;
            tracing::info!(bucket = %config.bucket, "Using S3 object store");
            Ok(Arc::new(store))
        }
        #[cfg(not(feature = "s3"))]
        StoreBackend::S3 => Err(Error::Config(
            "Built without the s3 feature; use the fs backend".to_string(),
        )),
    }
}
