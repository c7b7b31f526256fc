//! Bootstrap configuration helpers
//!
//! Each service resolves its settings in priority order:
//! 1. Command-line argument or environment variable (clap `env`)
//! 2. TOML config file given with `--config`
//! 3. Built-in default, where the setting has one
//!
//! A required setting missing from every tier is a fatal configuration error;
//! the service exits before binding its port.

use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::path::Path;

use crate::object_store::{ObjectStoreConfig, StoreBackend};
use crate::{Error, Result};

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct LoggingConfig {
    /// Log level or filter directive (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

/// `[object_store]` table shared by both services' TOML files
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ObjectStoreToml {
    pub backend: Option<StoreBackend>,
    pub bucket: Option<String>,
    pub region: Option<String>,
    pub endpoint_url: Option<String>,
    pub fs_root: Option<std::path::PathBuf>,
}

/// Load a TOML config file, or defaults when no file was given.
///
/// An explicitly named file that cannot be read or parsed is an error; a
/// silently ignored typo in a config path would hide real misconfiguration.
pub fn load_toml<T: DeserializeOwned + Default>(path: Option<&Path>) -> Result<T> {
    let Some(path) = path else {
        return Ok(T::default());
    };

    let content = std::fs::read_to_string(path)
        .map_err(|e| Error::Config(format!("Read {} failed: {}", path.display(), e)))?;
    toml::from_str(&content).map_err(|e| Error::Config(format!("Parse {} failed: {}", path.display(), e)))
}

/// Return the value of a required setting, rejecting absent or blank values
pub fn require(value: Option<String>, name: &str) -> Result<String> {
    match value {
        Some(v) if !v.trim().is_empty() => Ok(v),
        _ => Err(Error::Config(format!("Missing required configuration: {}", name))),
    }
}

/// Merge CLI/env object store settings over the TOML table
pub fn resolve_object_store(
    backend: Option<StoreBackend>,
    bucket: Option<String>,
    region: Option<String>,
    endpoint_url: Option<String>,
    toml: &ObjectStoreToml,
) -> Result<ObjectStoreConfig> {
    let backend = backend.or(toml.backend).unwrap_or_default();
    let bucket = require(bucket.or_else(|| toml.bucket.clone()), "BUCKET_NAME")?;
    let region = region.or_else(|| toml.region.clone());

    if backend == StoreBackend::S3 && region.as_deref().map_or(true, |r| r.trim().is_empty()) {
        return Err(Error::Config("Missing required configuration: REGION".to_string()));
    }

    Ok(ObjectStoreConfig {
        backend,
        bucket,
        region,
        endpoint_url: endpoint_url.or_else(|| toml.endpoint_url.clone()),
        fs_root: toml.fs_root.clone().unwrap_or_else(|| "buckets".into()),
    })
}

/// Initialize the global tracing subscriber.
///
/// `RUST_LOG` wins over the configured level when set.
pub fn init_tracing(logging: &LoggingConfig) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&logging.level));

    tracing_subscriber::fmt().with_env_filter(filter).init();
}
