//! Chat transport
//!
//! The gateway only needs three things from the chat network: file bytes for
//! a photo, a plain reply and a quoting reply. Webhook registration is
//! Telegram-specific and lives on [`TelegramTransport`] itself.

pub mod telegram;
pub mod update;

pub use telegram::{BotIdentity, TelegramTransport, DEFAULT_API_URL};
pub use update::{Chat, Message, Update};

use async_trait::async_trait;
use sightbot_common::Result;

#[async_trait]
pub trait ChatTransport: Send + Sync {
    /// Download the bytes of an uploaded file
    async fn fetch_file(&self, file_id: &str) -> Result<Vec<u8>>;

    /// Send a plain text message to a chat
    async fn send_text(&self, chat_id: i64, text: &str) -> Result<()>;

    /// Send a text message quoting an earlier message
    async fn send_text_with_quote(&self, chat_id: i64, text: &str, quoted_message_id: i64) -> Result<()>;
}
