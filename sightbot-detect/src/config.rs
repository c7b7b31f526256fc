//! Configuration for sightbot-detect
//!
//! Priority: command line / environment → TOML file (`--config`) → defaults.

use clap::Parser;
use serde::Deserialize;
use sightbot_common::config::{
    load_toml, require, resolve_object_store, LoggingConfig, ObjectStoreToml,
};
use sightbot_common::object_store::{ObjectStoreConfig, StoreBackend};
use sightbot_common::{Result, RetryPolicy};
use std::net::SocketAddr;
use std::path::PathBuf;

use crate::services::DetectorCommand;

const DEFAULT_LISTEN: &str = "0.0.0.0:8081";
const DEFAULT_WORK_ROOT: &str = "static/data";
const DEFAULT_CLASSES_FILE: &str = "data/coco128.names";

/// Command-line arguments for sightbot-detect
#[derive(Parser, Debug, Default)]
#[command(name = "sightbot-detect")]
#[command(about = "Object detection inference service")]
#[command(version)]
pub struct Args {
    /// TOML config file
    #[arg(short, long, env = "SIGHTBOT_DETECT_CONFIG")]
    pub config: Option<PathBuf>,

    /// Address to listen on
    #[arg(long, env = "LISTEN_ADDR")]
    pub listen: Option<SocketAddr>,

    /// Object store bucket holding the images
    #[arg(long, env = "BUCKET_NAME")]
    pub bucket: Option<String>,

    /// Object store region
    #[arg(long, env = "REGION")]
    pub region: Option<String>,

    /// Object store backend (s3 or fs)
    #[arg(long, env = "STORE_BACKEND")]
    pub store_backend: Option<StoreBackend>,

    /// Custom S3 endpoint URL
    #[arg(long, env = "S3_ENDPOINT_URL")]
    pub s3_endpoint: Option<String>,

    /// Prediction database URL, e.g. sqlite://predictions.db?mode=rwc
    #[arg(long, env = "DATABASE_URL")]
    pub database_url: Option<String>,

    /// Class names file (one per line, or TOML with `names = [..]`)
    #[arg(long, env = "CLASS_NAMES_FILE")]
    pub classes_file: Option<PathBuf>,

    /// Root directory for per-request work areas
    #[arg(long, env = "WORK_ROOT")]
    pub work_root: Option<PathBuf>,
}

/// TOML bootstrap file
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct DetectToml {
    pub logging: LoggingConfig,
    pub listen: Option<SocketAddr>,
    pub database_url: Option<String>,
    pub classes_file: Option<PathBuf>,
    pub work_root: Option<PathBuf>,
    pub object_store: ObjectStoreToml,
    pub detector: DetectorCommand,
    pub retry: RetryPolicy,
}

impl DetectToml {
    pub fn load(args: &Args) -> Result<Self> {
        load_toml(args.config.as_deref())
    }
}

/// Resolved, validated service configuration
#[derive(Debug, Clone)]
pub struct DetectConfig {
    pub listen: SocketAddr,
    pub database_url: String,
    pub classes_file: PathBuf,
    pub work_root: PathBuf,
    pub object_store: ObjectStoreConfig,
    pub detector: DetectorCommand,
    pub retry: RetryPolicy,
}

impl DetectConfig {
    pub fn resolve(args: Args, toml: DetectToml) -> Result<Self> {
        let object_store = resolve_object_store(
            args.store_backend,
            args.bucket,
            args.region,
            args.s3_endpoint,
            &toml.object_store,
        )?;

        let listen = match args.listen.or(toml.listen) {
            Some(addr) => addr,
            None => DEFAULT_LISTEN
                .parse()
                .map_err(|e| sightbot_common::Error::Config(format!("Bad default listen address: {}", e)))?,
        };

        Ok(Self {
            listen,
            database_url: require(args.database_url.or(toml.database_url), "DATABASE_URL")?,
            classes_file: args
                .classes_file
                .or(toml.classes_file)
                .unwrap_or_else(|| DEFAULT_CLASSES_FILE.into()),
            work_root: args
                .work_root
                .or(toml.work_root)
                .unwrap_or_else(|| DEFAULT_WORK_ROOT.into()),
            object_store,
            detector: toml.detector,
            retry: toml.retry,
        })
    }
}
