//! Amazon S3 object store
//!
//! Credentials come from the standard AWS chain (`AWS_ACCESS_KEY_ID`,
//! `AWS_SECRET_ACCESS_KEY`, profile files, instance roles).

use async_trait::async_trait;
use aws_sdk_s3::config::Region;
use aws_sdk_s3::error::{DisplayErrorContext, SdkError};
use aws_sdk_s3::operation::get_object::GetObjectError;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::Client;
use std::path::Path;

use super::ObjectStore;
use crate::types::StoredImageKey;
use crate::{Error, Result};

#[derive(Debug, Clone)]
pub struct S3ObjectStore {
    client: Client,
    bucket: String,
}

impl S3ObjectStore {
    /// Build the SDK client for `bucket` in `region`
    pub async fn connect(bucket: &str, region: String, endpoint_url: Option<String>) -> Self {
        let mut loader = aws_config::defaults(aws_config::BehaviorVersion::latest())
            .region(Region::new(region));
        if let Some(url) = &endpoint_url {
            loader = loader.endpoint_url(url);
        }
        let sdk_config = loader.load().await;

        let s3_config = aws_sdk_s3::config::Builder::from(&sdk_config)
            .force_path_style(endpoint_url.is_some())
            .build();

        Self {
            client: Client::from_conf(s3_config),
            bucket: bucket.to_string(),
        }
    }
}

fn is_not_found(err: &SdkError<GetObjectError>) -> bool {
    match err {
        SdkError::ServiceError(service) => {
            service.err().is_no_such_key() || service.raw().status().as_u16() == 404
        }
        _ => false,
    }
}

#[async_trait]
impl ObjectStore for S3ObjectStore {
    async fn upload(&self, local_path: &Path, key: &StoredImageKey) -> Result<()> {
        let body = ByteStream::from_path(local_path)
            .await
            .map_err(|e| Error::StoreWrite {
                key: key.to_string(),
                message: format!("cannot read {}: {}", local_path.display(), e),
            })?;

        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(key.as_str())
            .body(body)
            .send()
            .await
            .map_err(|e| Error::StoreWrite {
                key: key.to_string(),
                message: DisplayErrorContext(&e).to_string(),
            })?;

        tracing::debug!(bucket = %self.bucket, key = %key, "Uploaded to S3");
        Ok(())
    }

    async fn download(&self, key: &StoredImageKey, local_path: &Path) -> Result<()> {
        let output = match self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(key.as_str())
            .send()
            .await
        {
            Ok(output) => output,
            Err(err) if is_not_found(&err) => {
                return Err(Error::ImageNotFound { key: key.to_string() });
            }
            Err(err) => {
                return Err(Error::StoreRead {
                    key: key.to_string(),
                    message: DisplayErrorContext(&err).to_string(),
                });
            }
        };

        let bytes = output
            .body
            .collect()
            .await
            .map_err(|e| Error::StoreRead {
                key: key.to_string(),
                message: e.to_string(),
            })?
            .into_bytes();

        tokio::fs::write(local_path, &bytes)
            .await
            .map_err(|e| Error::StoreRead {
                key: key.to_string(),
                message: format!("cannot write {}: {}", local_path.display(), e),
            })?;

        tracing::debug!(bucket = %self.bucket, key = %key, bytes = bytes.len(), "Downloaded from S3");
        Ok(())
    }
}
