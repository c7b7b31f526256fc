//! Filesystem-backed object store
//!
//! Keys map to paths below the bucket directory. Used for local development
//! and in tests in place of S3.

use async_trait::async_trait;
use std::path::{Component, Path, PathBuf};

use super::ObjectStore;
use crate::types::StoredImageKey;
use crate::{Error, Result};

#[derive(Debug, Clone)]
pub struct FsObjectStore {
    bucket_dir: PathBuf,
}

impl FsObjectStore {
    /// Create the store, making the bucket directory if it is missing
    pub fn new(bucket_dir: impl Into<PathBuf>) -> Result<Self> {
        let bucket_dir = bucket_dir.into();
        std::fs::create_dir_all(&bucket_dir).map_err(|e| {
            Error::Config(format!("Cannot create bucket directory {}: {}", bucket_dir.display(), e))
        })?;
        Ok(Self { bucket_dir })
    }

    pub fn bucket_dir(&self) -> &Path {
        &self.bucket_dir
    }

    /// Resolve a key to its blob path, refusing anything that escapes the bucket
    pub fn blob_path(&self, key: &StoredImageKey) -> Result<PathBuf> {
        let relative = Path::new(key.as_str());
        let safe = relative
            .components()
            .all(|c| matches!(c, Component::Normal(_)));
        if !safe || key.as_str().is_empty() {
            return Err(Error::InvalidInput(format!("invalid object key: {:?}", key.as_str())));
        }
        Ok(self.bucket_dir.join(relative))
    }
}

#[async_trait]
impl ObjectStore for FsObjectStore {
    async fn upload(&self, local_path: &Path, key: &StoredImageKey) -> Result<()> {
        let target = self.blob_path(key)?;
        let write_err = |e: std::io::Error| Error::StoreWrite {
            key: key.to_string(),
            message: e.to_string(),
        };

        if let Some(parent) = target.parent() {
            tokio::fs::create_dir_all(parent).await.map_err(write_err)?;
        }
        tokio::fs::copy(local_path, &target).await.map_err(write_err)?;

        tracing::debug!(key = %key, path = %target.display(), "Blob written");
        Ok(())
    }

    async fn download(&self, key: &StoredImageKey, local_path: &Path) -> Result<()> {
        let source = self.blob_path(key)?;
        let read_err = |e: std::io::Error| match e.kind() {
            std::io::ErrorKind::NotFound => Error::ImageNotFound { key: key.to_string() },
            _ => Error::StoreRead {
                key: key.to_string(),
                message: e.to_string(),
            },
        };

        if !tokio::fs::try_exists(&source).await.map_err(read_err)? {
            return Err(Error::ImageNotFound { key: key.to_string() });
        }

        // The blob can vanish between the check and the copy
        tokio::fs::copy(&source, local_path).await.map_err(read_err)?;

        tracing::debug!(key = %key, path = %local_path.display(), "Blob read");
        Ok(())
    }
}
