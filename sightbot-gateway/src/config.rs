//! Configuration for sightbot-gateway
//!
//! Priority: command line / environment → TOML file (`--config`) → defaults.
//! Detection settings (object store, inference URL) are only required when the
//! gateway runs in `detect` mode.

use clap::Parser;
use serde::Deserialize;
use sightbot_common::config::{
    load_toml, require, resolve_object_store, LoggingConfig, ObjectStoreToml,
};
use sightbot_common::object_store::{ObjectStoreConfig, StoreBackend};
use sightbot_common::{Error, Result, RetryPolicy};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use crate::handlers::HandlerMode;
use crate::transport::DEFAULT_API_URL;

const DEFAULT_LISTEN: &str = "0.0.0.0:8443";
const DEFAULT_INFERENCE_TIMEOUT_SECS: u64 = 60;
const DEFAULT_PHOTOS_DIR: &str = "photos";

/// Command-line arguments for sightbot-gateway
#[derive(Parser, Debug, Default)]
#[command(name = "sightbot-gateway")]
#[command(about = "Chat gateway relaying photos to the detection service")]
#[command(version)]
pub struct Args {
    /// TOML config file
    #[arg(short, long, env = "SIGHTBOT_GATEWAY_CONFIG")]
    pub config: Option<PathBuf>,

    /// Address to listen on for webhook calls
    #[arg(long, env = "LISTEN_ADDR")]
    pub listen: Option<SocketAddr>,

    /// Telegram bot token
    #[arg(long, env = "TELEGRAM_TOKEN", hide_env_values = true)]
    pub telegram_token: Option<String>,

    /// Public base URL Telegram should call, e.g. https://bot.example.com
    #[arg(long, env = "TELEGRAM_APP_URL")]
    pub telegram_app_url: Option<String>,

    /// Base URL of the detection service
    #[arg(long, env = "YOLO_URL")]
    pub yolo_url: Option<String>,

    /// Message handler: echo, quote or detect
    #[arg(long, env = "HANDLER_MODE")]
    pub mode: Option<HandlerMode>,

    /// Object store bucket for uploaded photos
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

    /// Seconds to wait for the detection service
    #[arg(long, env = "INFERENCE_TIMEOUT_SECS")]
    pub inference_timeout_secs: Option<u64>,

    /// Directory for photos awaiting upload
    #[arg(long, env = "PHOTOS_DIR")]
    pub photos_dir: Option<PathBuf>,

    /// Register the webhook with Telegram at startup
    #[arg(long, env = "REGISTER_WEBHOOK")]
    pub register_webhook: Option<bool>,
}

/// TOML bootstrap file
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct GatewayToml {
    pub logging: LoggingConfig,
    pub listen: Option<SocketAddr>,
    pub telegram_token: Option<String>,
    pub telegram_app_url: Option<String>,
    /// Bot API base URL (a local Bot API server, for instance)
    pub telegram_api_url: Option<String>,
    pub yolo_url: Option<String>,
    pub mode: Option<HandlerMode>,
    pub inference_timeout_secs: Option<u64>,
    pub photos_dir: Option<PathBuf>,
    pub register_webhook: Option<bool>,
    pub object_store: ObjectStoreToml,
    pub retry: RetryPolicy,
}

impl GatewayToml {
    pub fn load(args: &Args) -> Result<Self> {
        load_toml(args.config.as_deref())
    }
}

/// Settings used only by the detect handler
#[derive(Debug, Clone)]
pub struct DetectSettings {
    pub yolo_url: String,
    pub inference_timeout: Duration,
    pub photos_dir: PathBuf,
    pub object_store: ObjectStoreConfig,
}

/// Resolved, validated gateway configuration
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    pub listen: SocketAddr,
    pub telegram_token: String,
    pub telegram_api_url: String,
    /// Set when the webhook should be registered at startup
    pub telegram_app_url: Option<String>,
    pub mode: HandlerMode,
    /// Present exactly when `mode` is `Detect`
    pub detect: Option<DetectSettings>,
    pub retry: RetryPolicy,
}

impl GatewayConfig {
    pub fn resolve(args: Args, toml: GatewayToml) -> Result<Self> {
        let telegram_token = require(args.telegram_token.or(toml.telegram_token), "TELEGRAM_TOKEN")?;

        let register_webhook = args.register_webhook.or(toml.register_webhook).unwrap_or(true);
        let telegram_app_url = if register_webhook {
            Some(require(
                args.telegram_app_url.or(toml.telegram_app_url),
                "TELEGRAM_APP_URL",
            )?)
        } else {
            None
        };

        let mode = args.mode.or(toml.mode).unwrap_or_default();
        let detect = if mode == HandlerMode::Detect {
            Some(DetectSettings {
                yolo_url: require(args.yolo_url.or(toml.yolo_url), "YOLO_URL")?,
                inference_timeout: Duration::from_secs(
                    args.inference_timeout_secs
                        .or(toml.inference_timeout_secs)
                        .unwrap_or(DEFAULT_INFERENCE_TIMEOUT_SECS),
                ),
                photos_dir: args
                    .photos_dir
                    .or(toml.photos_dir)
                    .unwrap_or_else(|| DEFAULT_PHOTOS_DIR.into()),
                object_store: resolve_object_store(
                    args.store_backend,
                    args.bucket,
                    args.region,
                    args.s3_endpoint,
                    &toml.object_store,
                )?,
            })
        } else {
            None
        };

        let listen = match args.listen.or(toml.listen) {
            Some(addr) => addr,
            None => DEFAULT_LISTEN
                .parse()
                .map_err(|e| Error::Config(format!("Bad default listen address: {}", e)))?,
        };

        Ok(Self {
            listen,
            telegram_token,
            telegram_api_url: toml.telegram_api_url.unwrap_or_else(|| DEFAULT_API_URL.to_string()),
            telegram_app_url,
            mode,
            detect,
            retry: toml.retry,
        })
    }
}
