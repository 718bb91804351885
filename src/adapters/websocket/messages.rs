//! Chat channel protocol.
//!
//! Every frame is a JSON text frame of the form `{"event": ..., "data": {...}}`.
//!
//! - Client → Server: `join-chat`, `send-message`
//! - Server → Client: `new-message`, and `error` when error events are enabled

use serde::{Deserialize, Serialize};

use crate::domain::chat::Message;

// ============================================
// Client → Server Messages
// ============================================

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "kebab-case")]
pub enum ClientMessage {
    /// Subscribe this channel to a conversation's room.
    JoinChat(JoinChat),
    /// Persist a message and fan it out to the conversation's room.
    SendMessage(SendMessage),
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JoinChat {
    pub room_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendMessage {
    pub product_id: String,
    pub content: String,
    #[serde(default)]
    pub buyer_id: Option<String>,
}

// ============================================
// Server → Client Messages
// ============================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", content = "data", rename_all = "kebab-case")]
pub enum ServerMessage {
    /// A message persisted to a room this channel has joined.
    NewMessage(NewMessage),
    /// Why the channel's last event was dropped.
    Error(ErrorMessage),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewMessage {
    pub id: String,
    pub sender_id: String,
    pub content: String,
    pub created_at: String,
}

impl From<&Message> for NewMessage {
    fn from(message: &Message) -> Self {
        Self {
            id: message.id.to_string(),
            sender_id: message.sender_id.to_string(),
            content: message.content.as_str().to_string(),
            created_at: message.created_at.to_rfc3339(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ErrorMessage {
    pub code: String,
    pub message: String,
}

impl ErrorMessage {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
        }
    }
}
