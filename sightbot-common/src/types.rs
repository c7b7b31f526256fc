//! Shared data model passed between the gateway and the detection service
//!
//! Serialized field names (`original_img_path`, `class`, `cx`, ...) are part of
//! the HTTP contract between the services and of every stored document.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::time::epoch_seconds;

/// Unique token minted once per inference request.
///
/// Used as the work-area namespace and the prediction id, so every artifact of
/// one request can be traced back to it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CorrelationId(Uuid);

impl CorrelationId {
    /// Mint a fresh random id
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for CorrelationId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for CorrelationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl std::str::FromStr for CorrelationId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s).map(Self)
    }
}

/// One resolution of an uploaded chat photo
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhotoVariant {
    pub file_id: String,
    pub file_unique_id: String,
    pub width: u32,
    pub height: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_size: Option<u64>,
}

/// Inbound chat message, reduced to what the handlers need
///
/// `photo_variants` is ordered smallest to largest, as the transport sends
/// them. An empty list means the message carries no photo.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatPhotoEvent {
    pub chat_id: i64,
    pub message_id: i64,
    pub text: Option<String>,
    pub photo_variants: Vec<PhotoVariant>,
}

impl ChatPhotoEvent {
    pub fn is_photo(&self) -> bool {
        !self.photo_variants.is_empty()
    }

    /// Highest-resolution variant (always the last one)
    pub fn largest_photo(&self) -> Option<&PhotoVariant> {
        self.photo_variants.last()
    }
}

/// Key under which an image blob lives in the object store
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StoredImageKey(String);

impl StoredImageKey {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    /// Key for an original chat photo: `<file_unique_id>.jpg`
    pub fn for_photo(file_unique_id: &str) -> Self {
        Self(format!("{}.jpg", file_unique_id))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Last path segment of the key, used for local file names
    pub fn file_name(&self) -> &str {
        self.0.rsplit('/').next().unwrap_or(&self.0)
    }

    /// File name without its final extension
    pub fn file_stem(&self) -> &str {
        let name = self.file_name();
        match name.rfind('.') {
            Some(idx) if idx > 0 => &name[..idx],
            _ => name,
        }
    }

    /// Key for the annotated copy: `<base>_prediction.jpg`
    ///
    /// Any directory prefix of the original key is kept. The result never
    /// equals the original key.
    pub fn annotated(&self) -> Self {
        let name = self.file_name();
        let prefix = &self.0[..self.0.len() - name.len()];
        Self(format!("{}{}_prediction.jpg", prefix, self.file_stem()))
    }

    /// Reject keys that cannot safely become a local file name
    pub fn validate(&self) -> crate::Result<()> {
        let name = self.file_name();
        if self.0.trim().is_empty() || name.is_empty() || name == "." || name == ".." {
            return Err(crate::Error::InvalidInput(format!(
                "invalid image key: {:?}",
                self.0
            )));
        }
        Ok(())
    }
}

impl fmt::Display for StoredImageKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One detected object in normalized bounding-box form
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectionLabel {
    #[serde(rename = "class")]
    pub class_name: String,
    #[serde(rename = "cx")]
    pub center_x: f64,
    #[serde(rename = "cy")]
    pub center_y: f64,
    pub width: f64,
    pub height: f64,
}

/// Structured result of one successful inference.
///
/// Created once, persisted once, never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionSummary {
    pub prediction_id: CorrelationId,
    #[serde(rename = "original_img_path")]
    pub original_image_key: StoredImageKey,
    #[serde(rename = "predicted_img_path")]
    pub annotated_image_key: StoredImageKey,
    pub labels: Vec<DetectionLabel>,
    #[serde(rename = "time", with = "epoch_seconds")]
    pub created_at: DateTime<Utc>,
}

/// Document written to the prediction store, one per request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PersistedPrediction {
    pub img_name: String,
    pub predictions: PredictionSummary,
}

impl From<&PredictionSummary> for PersistedPrediction {
    fn from(summary: &PredictionSummary) -> Self {
        Self {
            img_name: summary.original_image_key.to_string(),
            predictions: summary.clone(),
        }
    }
}
