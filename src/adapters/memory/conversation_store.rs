//! In-memory conversation store.

use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;

use crate::domain::chat::{Conversation, ConversationKey, Message, MessageContent};
use crate::domain::foundation::{ConversationId, DomainError, ErrorCode, ProductId, UserId};
use crate::ports::ConversationStore;

#[derive(Default)]
struct State {
    conversations: HashMap<ConversationId, Conversation>,
    /// Uniqueness index on (product, buyer).
    by_pair: HashMap<(ProductId, UserId), ConversationId>,
}

/// Conversation store backed by a single `RwLock`.
///
/// `create` checks the `(product, buyer)` index and inserts under one write
/// guard, so it gives the same at-most-one guarantee as the database's
/// unique constraint.
#[derive(Default)]
pub struct InMemoryConversationStore {
    state: RwLock<State>,
}

impl InMemoryConversationStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored conversations (for test assertions).
    pub async fn len(&self) -> usize {
        self.state.read().await.conversations.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

#[async_trait]
impl ConversationStore for InMemoryConversationStore {
    async fn find(&self, key: &ConversationKey) -> Result<Option<Conversation>, DomainError> {
        let state = self.state.read().await;
        let found = state
            .by_pair
            .get(&(key.product_id, key.buyer_id.clone()))
            .and_then(|id| state.conversations.get(id))
            .filter(|c| c.seller_id() == &key.seller_id)
            .cloned();
        Ok(found)
    }

    async fn create(&self, key: &ConversationKey) -> Result<Conversation, DomainError> {
        let mut state = self.state.write().await;
        let pair = (key.product_id, key.buyer_id.clone());

        if state.by_pair.contains_key(&pair) {
            return Err(DomainError::conflict(format!(
                "Conversation already exists for product {} and buyer {}",
                key.product_id, key.buyer_id
            )));
        }

        let conversation = Conversation::start(key.clone());
        state.by_pair.insert(pair, *conversation.id());
        state
            .conversations
            .insert(*conversation.id(), conversation.clone());
        Ok(conversation)
    }

    async fn append_message(
        &self,
        conversation_id: &ConversationId,
        sender_id: &UserId,
        content: MessageContent,
    ) -> Result<Message, DomainError> {
        let mut state = self.state.write().await;
        let conversation = state.conversations.get_mut(conversation_id).ok_or_else(|| {
            DomainError::new(
                ErrorCode::ConversationNotFound,
                format!("Conversation not found: {}", conversation_id),
            )
        })?;

        let message = Message::new(sender_id.clone(), content);
        conversation.record(message.clone());
        Ok(message)
    }

    async fn list_for_seller(
        &self,
        seller_id: &UserId,
        product_id: &ProductId,
    ) -> Result<Vec<Conversation>, DomainError> {
        let state = self.state.read().await;
        let mut listed: Vec<Conversation> = state
            .conversations
            .values()
            .filter(|c| c.product_id() == product_id && c.seller_id() == seller_id)
            .cloned()
            .collect();
        listed.sort_by(|a, b| b.updated_at().cmp(a.updated_at()));
        Ok(listed)
    }
}
