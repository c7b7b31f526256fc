//! Message-handling strategies
//!
//! Exactly one strategy serves a running gateway, chosen by [`HandlerMode`]:
//! echo the text back, quote it back, or run photo detection.

use async_trait::async_trait;
use serde::Deserialize;
use sightbot_common::{ChatPhotoEvent, Error};
use std::sync::Arc;
use tracing::{error, info};

use crate::transport::ChatTransport;

/// Text that opts out of the quoting reply
pub const NO_QUOTE_TEXT: &str = "Please don't quote me";

#[async_trait]
pub trait MessageHandler: Send + Sync {
    /// Handle one inbound event. Failures are logged and, where the strategy
    /// defines it, answered in the chat; nothing is returned to the caller.
    async fn handle(&self, event: ChatPhotoEvent);
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HandlerMode {
    Echo,
    Quote,
    #[default]
    Detect,
}

impl std::str::FromStr for HandlerMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "echo" => Ok(HandlerMode::Echo),
            "quote" => Ok(HandlerMode::Quote),
            "detect" => Ok(HandlerMode::Detect),
            other => Err(Error::Config(format!(
                "Unknown handler mode {:?} (expected echo, quote or detect)",
                other
            ))),
        }
    }
}

/// Replies `Your original message: <text>`
pub struct EchoHandler {
    transport: Arc<dyn ChatTransport>,
}

impl EchoHandler {
    pub fn new(transport: Arc<dyn ChatTransport>) -> Self {
        Self { transport }
    }
}

#[async_trait]
impl MessageHandler for EchoHandler {
    async fn handle(&self, event: ChatPhotoEvent) {
        let Some(text) = event.text.as_deref() else {
            info!(chat_id = event.chat_id, "Message has no text, nothing to echo");
            return;
        };

        let reply = format!("Your original message: {}", text);
        if let Err(e) = self.transport.send_text(event.chat_id, &reply).await {
            error!(chat_id = event.chat_id, error = %e, "Failed to send echo reply");
        }
    }
}

/// Sends the text back quoting the original message
pub struct QuoteHandler {
    transport: Arc<dyn ChatTransport>,
}

impl QuoteHandler {
    pub fn new(transport: Arc<dyn ChatTransport>) -> Self {
        Self { transport }
    }
}

#[async_trait]
impl MessageHandler for QuoteHandler {
    async fn handle(&self, event: ChatPhotoEvent) {
        let Some(text) = event.text.as_deref() else {
            info!(chat_id = event.chat_id, "Message has no text, nothing to quote");
            return;
        };

        let sent = if text == NO_QUOTE_TEXT {
            self.transport.send_text(event.chat_id, text).await
        } else {
            self.transport
                .send_text_with_quote(event.chat_id, text, event.message_id)
                .await
        };

        if let Err(e) = sent {
            error!(chat_id = event.chat_id, error = %e, "Failed to send quote reply");
        }
    }
}
