//! Conversation aggregate.
//!
//! A conversation is the persisted thread between one buyer and the seller
//! of one product. Identity is the triple `(product, buyer, seller)`; the
//! store additionally guarantees at most one conversation per
//! `(product, buyer)`.

use serde::{Deserialize, Serialize};

use crate::domain::foundation::{
    ConversationId, DomainError, ProductId, Timestamp, UserId,
};

use super::{Message, RoomId};

/// The three-way key a conversation is looked up by.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ConversationKey {
    pub product_id: ProductId,
    pub buyer_id: UserId,
    pub seller_id: UserId,
}

impl ConversationKey {
    /// Builds a key, rejecting a seller chatting with themselves.
    pub fn new(
        product_id: ProductId,
        buyer_id: UserId,
        seller_id: UserId,
    ) -> Result<Self, DomainError> {
        if buyer_id == seller_id {
            return Err(DomainError::validation(
                "buyerId",
                "A seller cannot open a conversation on their own product",
            ));
        }
        Ok(Self {
            product_id,
            buyer_id,
            seller_id,
        })
    }

    /// The live room both participants share.
    pub fn room_id(&self) -> RoomId {
        RoomId::for_conversation(&self.product_id, &self.buyer_id)
    }
}

/// Conversation aggregate with its append-only message log.
///
/// # Invariants
///
/// - `messages` are in insertion order and never reordered or removed
/// - `updated_at` is bumped on every appended message
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Conversation {
    id: ConversationId,
    key: ConversationKey,
    messages: Vec<Message>,
    created_at: Timestamp,
    updated_at: Timestamp,
}

impl Conversation {
    /// Starts an empty conversation.
    pub fn start(key: ConversationKey) -> Self {
        let now = Timestamp::now();
        Self {
            id: ConversationId::new(),
            key,
            messages: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Reconstitute a conversation from persistence (no validation).
    pub fn reconstitute(
        id: ConversationId,
        key: ConversationKey,
        messages: Vec<Message>,
        created_at: Timestamp,
        updated_at: Timestamp,
    ) -> Self {
        Self {
            id,
            key,
            messages,
            created_at,
            updated_at,
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Accessors
    // ─────────────────────────────────────────────────────────────────────────

    pub fn id(&self) -> &ConversationId {
        &self.id
    }

    pub fn key(&self) -> &ConversationKey {
        &self.key
    }

    pub fn product_id(&self) -> &ProductId {
        &self.key.product_id
    }

    pub fn buyer_id(&self) -> &UserId {
        &self.key.buyer_id
    }

    pub fn seller_id(&self) -> &UserId {
        &self.key.seller_id
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn last_message(&self) -> Option<&Message> {
        self.messages.last()
    }

    pub fn message_count(&self) -> usize {
        self.messages.len()
    }

    pub fn created_at(&self) -> &Timestamp {
        &self.created_at
    }

    pub fn updated_at(&self) -> &Timestamp {
        &self.updated_at
    }

    pub fn room_id(&self) -> RoomId {
        self.key.room_id()
    }

    /// True if `user` is the buyer or the seller.
    pub fn is_participant(&self, user: &UserId) -> bool {
        self.key.buyer_id == *user || self.key.seller_id == *user
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Mutations
    // ─────────────────────────────────────────────────────────────────────────

    /// Appends a stored message and bumps `updated_at`.
    pub fn record(&mut self, message: Message) {
        self.updated_at = std::cmp::max(self.updated_at, message.created_at);
        self.messages.push(message);
    }
}
