//! Telegram Bot API client
//!
//! Every call goes through `POST <api>/bot<token>/<method>` with a JSON body;
//! file downloads use `GET <api>/file/bot<token>/<file_path>`.
//!
//! The bot token is part of every URL, so errors are stripped of their URL
//! before they reach a log line.

use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::json;
use sightbot_common::{Error, Result};
use std::time::Duration;
use tracing::{debug, info};

use super::ChatTransport;

/// Public Bot API endpoint
pub const DEFAULT_API_URL: &str = "https://api.telegram.org";

/// Request timeout for Bot API calls (matches the webhook registration timeout)
const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

/// Pause between removing the old webhook and setting the new one
const WEBHOOK_RESET_PAUSE: Duration = Duration::from_millis(500);

/// Bot API response wrapper
#[derive(Debug, Deserialize)]
struct ApiResponse<T> {
    ok: bool,
    result: Option<T>,
    #[serde(default)]
    description: Option<String>,
}

#[derive(Debug, Deserialize)]
struct FileInfo {
    #[serde(default)]
    file_path: Option<String>,
}

/// Result of `getMe`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BotIdentity {
    pub id: i64,
    pub first_name: String,
    #[serde(default)]
    pub username: Option<String>,
}

pub struct TelegramTransport {
    http_client: Client,
    api_url: String,
    token: String,
}

impl TelegramTransport {
    pub fn new(api_url: &str, token: &str) -> Result<Self> {
        let http_client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| Error::Config(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            http_client,
            api_url: api_url.trim_end_matches('/').to_string(),
            token: token.to_string(),
        })
    }

    fn method_url(&self, method: &str) -> String {
        format!("{}/bot{}/{}", self.api_url, self.token, method)
    }

    fn file_url(&self, file_path: &str) -> String {
        format!("{}/file/bot{}/{}", self.api_url, self.token, file_path)
    }

    async fn call<T: DeserializeOwned>(&self, method: &str, body: serde_json::Value) -> Result<T> {
        debug!(method, "Bot API call");

        let response = self
            .http_client
            .post(self.method_url(method))
            .json(&body)
            .send()
            .await
            .map_err(|e| transport_error(method, e))?;

        let status = response.status();
        let parsed: ApiResponse<T> = response
            .json()
            .await
            .map_err(|e| transport_error(method, e))?;

        if !parsed.ok {
            return Err(Error::TransportFetch(format!(
                "{} rejected ({}): {}",
                method,
                status,
                parsed.description.unwrap_or_default()
            )));
        }

        parsed
            .result
            .ok_or_else(|| Error::TransportFetch(format!("{} returned no result", method)))
    }

    /// Remove any webhook registered for this bot
    pub async fn delete_webhook(&self) -> Result<()> {
        self.call::<bool>("deleteWebhook", json!({})).await.map(|_| ())
    }

    /// Point the bot's webhook at `url`
    pub async fn set_webhook(&self, url: &str) -> Result<()> {
        self.call::<bool>("setWebhook", json!({ "url": url })).await.map(|_| ())
    }

    pub async fn get_me(&self) -> Result<BotIdentity> {
        self.call("getMe", json!({})).await
    }

    /// Replace the webhook with `<app_url>/<token>/` and log the bot identity
    pub async fn register_webhook(&self, app_url: &str) -> Result<()> {
        self.delete_webhook().await?;
        tokio::time::sleep(WEBHOOK_RESET_PAUSE).await;

        self.set_webhook(&webhook_url(app_url, &self.token)).await?;
        info!(app_url, "Webhook registered");

        let me = self.get_me().await?;
        info!(
            bot_id = me.id,
            username = me.username.as_deref().unwrap_or(""),
            first_name = %me.first_name,
            "Telegram bot information"
        );
        Ok(())
    }
}

/// Webhook URL for a bot: the token is the path, so only Telegram knows it
pub fn webhook_url(app_url: &str, token: &str) -> String {
    format!("{}/{}/", app_url.trim_end_matches('/'), token)
}

fn transport_error(method: &str, err: reqwest::Error) -> Error {
    Error::TransportFetch(format!("{} failed: {}", method, err.without_url()))
}

#[async_trait]
impl ChatTransport for TelegramTransport {
    async fn fetch_file(&self, file_id: &str) -> Result<Vec<u8>> {
        let info: FileInfo = self.call("getFile", json!({ "file_id": file_id })).await?;
        let file_path = info
            .file_path
            .ok_or_else(|| Error::TransportFetch(format!("file {} has no download path", file_id)))?;

        let response = self
            .http_client
            .get(self.file_url(&file_path))
            .send()
            .await
            .map_err(|e| transport_error("file download", e))?;

        if !response.status().is_success() {
            return Err(Error::TransportFetch(format!(
                "file download returned {}",
                response.status()
            )));
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| transport_error("file download", e))?;
        debug!(file_id, size = bytes.len(), "Photo fetched");
        Ok(bytes.to_vec())
    }

    async fn send_text(&self, chat_id: i64, text: &str) -> Result<()> {
        self.call::<serde_json::Value>("sendMessage", json!({ "chat_id": chat_id, "text": text }))
            .await
            .map(|_| ())
    }

    async fn send_text_with_quote(&self, chat_id: i64, text: &str, quoted_message_id: i64) -> Result<()> {
        self.call::<serde_json::Value>(
            "sendMessage",
            json!({
                "chat_id": chat_id,
                "text": text,
                "reply_to_message_id": quoted_message_id,
            }),
        )
        .await
        .map(|_| ())
    }
}
