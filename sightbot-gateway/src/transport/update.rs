//! Webhook update envelope
//!
//! Only the fields the handlers read are decoded; everything else Telegram
//! sends is ignored.

use serde::Deserialize;
use sightbot_common::{ChatPhotoEvent, PhotoVariant};

#[derive(Debug, Clone, Deserialize)]
pub struct Update {
    pub update_id: i64,
    #[serde(default)]
    pub message: Option<Message>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Message {
    pub message_id: i64,
    pub chat: Chat,
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub photo: Option<Vec<PhotoVariant>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Chat {
    pub id: i64,
}

impl Update {
    /// Reduce the envelope to a chat event; `None` for non-message updates
    pub fn into_event(self) -> Option<ChatPhotoEvent> {
        let message = self.message?;
        Some(ChatPhotoEvent {
            chat_id: message.chat.id,
            message_id: message.message_id,
            text: message.text,
            photo_variants: message.photo.unwrap_or_default(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_photo_update() {
        let update: Update = serde_json::from_str(
            r#"{
                "update_id": 10,
                "message": {
                    "message_id": 7,
                    "date": 1700000000,
                    "chat": {"id": -42, "type": "private"},
                    "photo": [
                        {"file_id": "s", "file_unique_id": "us", "width": 90, "height": 60, "file_size": 1200},
                        {"file_id": "l", "file_unique_id": "ul", "width": 1280, "height": 853}
                    ]
                }
            }"#,
        )
        .unwrap();

        let event = update.into_event().unwrap();
        assert_eq!(event.chat_id, -42);
        assert_eq!(event.message_id, 7);
        assert_eq!(event.text, None);
        assert_eq!(event.photo_variants.len(), 2);
        assert_eq!(event.largest_photo().unwrap().file_unique_id, "ul");
    }

    #[test]
    fn test_text_update() {
        let update: Update = serde_json::from_str(
            r#"{"update_id": 11, "message": {"message_id": 8, "chat": {"id": 5}, "text": "hi"}}"#,
        )
        .unwrap();

        let event = update.into_event().unwrap();
        assert!(!event.is_photo());
        assert_eq!(event.text.as_deref(), Some("hi"));
    }

    #[test]
    fn test_update_without_message() {
        let update: Update =
            serde_json::from_str(r#"{"update_id": 12, "edited_message": {"message_id": 1}}"#).unwrap();
        assert!(update.into_event().is_none());
    }
}
