use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// An incoming message from a channel.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IncomingMessage {
    pub id: Uuid,
    /// Channel name (e.g. "telegram").
    pub channel: String,
    /// Platform-assigned actor identifier.
    pub sender_id: String,
    /// Human-readable sender name.
    pub sender_name: Option<String>,
    /// Conversation the message arrived in (e.g. Telegram chat_id).
    pub conversation_id: String,
    /// Message text content.
    pub text: String,
    pub timestamp: DateTime<Utc>,
    /// Whether this message comes from a group chat.
    #[serde(default)]
    pub is_group: bool,
}

impl IncomingMessage {
    /// Build a text message arriving now.
    pub fn text(channel: &str, sender_id: &str, conversation_id: &str, text: &str) -> Self {
        Self {
            id: Uuid::new_v4(),
            channel: channel.to_string(),
            sender_id: sender_id.to_string(),
            sender_name: None,
            conversation_id: conversation_id.to_string(),
            text: text.to_string(),
            timestamp: Utc::now(),
            is_group: false,
        }
    }
}

/// An outgoing message to send through a channel.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OutgoingMessage {
    pub text: String,
    /// Conversation to deliver into.
    pub conversation_id: String,
}

impl OutgoingMessage {
    pub fn new(conversation_id: &str, text: &str) -> Self {
        Self {
            text: text.to_string(),
            conversation_id: conversation_id.to_string(),
        }
    }
}
