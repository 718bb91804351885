//! Chat message entity.
//!
//! Messages are immutable once stored. The only way to create one is
//! through `MessageContent`, which guarantees the text is trimmed and
//! non-empty.

use serde::{Deserialize, Serialize};

use crate::domain::foundation::{MessageId, Timestamp, UserId, ValidationError};

/// Trimmed, non-empty message text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct MessageContent(String);

impl MessageContent {
    /// Trims `raw` and rejects it if nothing is left.
    pub fn new(raw: impl AsRef<str>) -> Result<Self, ValidationError> {
        let trimmed = raw.as_ref().trim();
        if trimmed.is_empty() {
            return Err(ValidationError::empty_field("content"));
        }
        Ok(Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for MessageContent {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<MessageContent> for String {
    fn from(content: MessageContent) -> Self {
        content.0
    }
}

/// A single message in a conversation log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub id: MessageId,
    pub sender_id: UserId,
    pub content: MessageContent,
    pub created_at: Timestamp,
}

impl Message {
    /// Creates a new message stamped with the current time.
    pub fn new(sender_id: UserId, content: MessageContent) -> Self {
        Self {
            id: MessageId::new(),
            sender_id,
            content,
            created_at: Timestamp::now(),
        }
    }
}
