//! # sightbot common library
//!
//! Shared code for both sightbot services:
//! - Error taxonomy and retry classification
//! - Data model (correlation ids, chat events, labels, prediction summaries)
//! - Label parsing and reply formatting
//! - Object store client
//! - Configuration and tracing bootstrap

pub mod config;
pub mod error;
pub mod format;
pub mod labels;
pub mod object_store;
pub mod retry;
pub mod shutdown;
pub mod time;
pub mod types;

pub use error::{Error, Result};
pub use labels::ClassNames;
pub use retry::RetryPolicy;
pub use types::{
    ChatPhotoEvent, CorrelationId, DetectionLabel, PersistedPrediction, PhotoVariant,
    PredictionSummary, StoredImageKey,
};
