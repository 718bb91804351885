//! Conversation store port.
//!
//! Persists conversations and their message logs.
//!
//! # Design
//!
//! - **One per (product, buyer)**: enforced by the store itself (a unique
//!   constraint or an equivalent atomic check), never by callers doing
//!   find-then-create. A losing concurrent `create` must fail with
//!   `ErrorCode::Conflict`.
//! - **Append-only**: messages are appended in commit order and never
//!   edited or removed.

use async_trait::async_trait;

use crate::domain::chat::{Conversation, ConversationKey, Message, MessageContent};
use crate::domain::foundation::{ConversationId, DomainError, ProductId, UserId};

/// Repository port for conversation persistence.
#[async_trait]
pub trait ConversationStore: Send + Sync {
    /// Find a conversation by its full three-way key.
    ///
    /// Returns `None` if absent. Messages are included in insertion order.
    async fn find(&self, key: &ConversationKey) -> Result<Option<Conversation>, DomainError>;

    /// Create an empty conversation.
    ///
    /// # Errors
    ///
    /// - `Conflict` if a conversation already exists for `(product, buyer)`
    /// - `DatabaseError` on persistence failure
    async fn create(&self, key: &ConversationKey) -> Result<Conversation, DomainError>;

    /// Append a message and bump the conversation's `updated_at`.
    ///
    /// # Errors
    ///
    /// - `ConversationNotFound` if the conversation no longer exists
    /// - `DatabaseError` on persistence failure
    ///
    /// Empty content is unrepresentable here; `MessageContent` has already
    /// rejected it with a validation error.
    async fn append_message(
        &self,
        conversation_id: &ConversationId,
        sender_id: &UserId,
        content: MessageContent,
    ) -> Result<Message, DomainError>;

    /// All conversations a seller has on one product, most recently
    /// updated first.
    async fn list_for_seller(
        &self,
        seller_id: &UserId,
        product_id: &ProductId,
    ) -> Result<Vec<Conversation>, DomainError>;
}
