//! HTTP DTOs for chat endpoints.
//!
//! Field names are camelCase on the wire. Timestamps are RFC 3339 strings.

use serde::{Deserialize, Serialize};

use crate::application::handlers::chat::{ChatView, ConversationSummary};
use crate::domain::chat::Message;
use crate::domain::marketplace::UserProfile;

// ════════════════════════════════════════════════════════════════════════════════
// Response DTOs
// ════════════════════════════════════════════════════════════════════════════════

/// `{id, name, email}` of a chat participant.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParticipantDto {
    pub id: String,
    pub name: String,
    pub email: String,
}

impl From<UserProfile> for ParticipantDto {
    fn from(profile: UserProfile) -> Self {
        Self {
            id: profile.id.to_string(),
            name: profile.name,
            email: profile.email,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageDto {
    pub id: String,
    pub sender_id: String,
    pub content: String,
    pub created_at: String,
}

impl From<&Message> for MessageDto {
    fn from(message: &Message) -> Self {
        Self {
            id: message.id.to_string(),
            sender_id: message.sender_id.to_string(),
            content: message.content.as_str().to_string(),
            created_at: message.created_at.to_rfc3339(),
        }
    }
}

/// A full conversation with its message history.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatDto {
    pub id: String,
    pub product_id: String,
    pub buyer: ParticipantDto,
    pub seller: ParticipantDto,
    pub messages: Vec<MessageDto>,
    pub created_at: String,
    pub updated_at: String,
}

impl From<ChatView> for ChatDto {
    fn from(view: ChatView) -> Self {
        let conversation = view.conversation;
        Self {
            id: conversation.id().to_string(),
            product_id: conversation.product_id().to_string(),
            buyer: view.buyer.into(),
            seller: view.seller.into(),
            messages: conversation.messages().iter().map(MessageDto::from).collect(),
            created_at: conversation.created_at().to_rfc3339(),
            updated_at: conversation.updated_at().to_rfc3339(),
        }
    }
}

/// Body of `GET /api/chats/:productId`. `chat` is `null` when a seller asks
/// for a buyer who has not started a conversation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatResponse {
    pub success: bool,
    pub chat: Option<ChatDto>,
}

/// One row of the seller's inbox.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatSummaryDto {
    pub id: String,
    pub buyer: ParticipantDto,
    pub last_message: Option<MessageDto>,
    pub last_message_at: Option<String>,
    pub message_count: usize,
    pub updated_at: String,
}

impl From<ConversationSummary> for ChatSummaryDto {
    fn from(summary: ConversationSummary) -> Self {
        Self {
            id: summary.id.to_string(),
            buyer: summary.buyer.into(),
            last_message_at: summary
                .last_message
                .as_ref()
                .map(|m| m.created_at.to_rfc3339()),
            last_message: summary.last_message.as_ref().map(MessageDto::from),
            message_count: summary.message_count,
            updated_at: summary.updated_at.to_rfc3339(),
        }
    }
}

/// Body of `GET /api/products/:productId/chats`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatListResponse {
    pub success: bool,
    pub chats: Vec<ChatSummaryDto>,
}

/// Error body: `{success: false, message, code}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub success: bool,
    pub message: String,
    pub code: String,
}

impl ErrorResponse {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
            code: code.into(),
        }
    }
}

// ════════════════════════════════════════════════════════════════════════════════
// Request DTOs
// ════════════════════════════════════════════════════════════════════════════════

/// Query string of `GET /api/chats/:productId`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatQuery {
    /// The buyer whose conversation a seller wants to open.
    #[serde(default)]
    pub buyer_id: Option<String>,
}
