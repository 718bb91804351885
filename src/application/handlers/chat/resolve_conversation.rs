//! ResolveConversationHandler - finds (or, for buyers, lazily creates) the
//! conversation a caller is asking for.
//!
//! The caller's role decides the key:
//!
//! | Caller | Key                                  | If absent       |
//! |--------|--------------------------------------|-----------------|
//! | Seller | (product, supplied buyer, caller)    | `None`          |
//! | Buyer  | (product, caller, product owner)     | create, re-read |
//!
//! Sellers never create conversations: a seller looking at a buyer who has
//! not written yet gets `None`, not an empty thread.

use std::sync::Arc;

use crate::domain::chat::{Conversation, ConversationKey};
use crate::domain::foundation::{DomainError, ErrorCode, ProductId, UserId};
use crate::domain::marketplace::{ParticipantRole, UserProfile};
use crate::ports::{ConversationStore, ProductReader, UserReader};

/// Query to resolve the conversation a caller is looking at.
#[derive(Debug, Clone)]
pub struct ResolveConversationQuery {
    /// Authenticated caller.
    pub caller: UserId,
    /// Product the conversation is about.
    pub product_id: ProductId,
    /// The buyer, when the caller is the seller. Ignored for buyers.
    pub counterpart: Option<UserId>,
}

/// A conversation with both participants' profiles.
#[derive(Debug, Clone)]
pub struct ChatView {
    pub conversation: Conversation,
    pub buyer: UserProfile,
    pub seller: UserProfile,
}

/// Handler for resolving conversations.
pub struct ResolveConversationHandler {
    products: Arc<dyn ProductReader>,
    users: Arc<dyn UserReader>,
    store: Arc<dyn ConversationStore>,
}

impl ResolveConversationHandler {
    pub fn new(
        products: Arc<dyn ProductReader>,
        users: Arc<dyn UserReader>,
        store: Arc<dyn ConversationStore>,
    ) -> Self {
        Self {
            products,
            users,
            store,
        }
    }

    pub async fn handle(
        &self,
        query: ResolveConversationQuery,
    ) -> Result<Option<ChatView>, DomainError> {
        let product = self
            .products
            .find_product(&query.product_id)
            .await?
            .ok_or_else(|| {
                DomainError::new(
                    ErrorCode::ProductNotFound,
                    format!("Product not found: {}", query.product_id),
                )
            })?;

        let conversation = match product.role_of(&query.caller) {
            ParticipantRole::Seller => {
                let buyer_id = query.counterpart.ok_or_else(|| {
                    DomainError::validation("buyerId", "buyerId is required to open a buyer's chat")
                })?;
                let key = ConversationKey::new(*product.id(), buyer_id, query.caller)?;

                match self.store.find(&key).await? {
                    Some(conversation) => conversation,
                    None => {
                        tracing::debug!(
                            product_id = %key.product_id,
                            buyer_id = %key.buyer_id,
                            "Seller opened a chat the buyer has not started"
                        );
                        return Ok(None);
                    }
                }
            }
            ParticipantRole::Buyer => {
                let key =
                    ConversationKey::new(*product.id(), query.caller, product.owner_id().clone())?;
                self.find_or_create(&key).await?
            }
        };

        self.present(conversation).await.map(Some)
    }

    /// Find-then-create with the store's uniqueness constraint as arbiter.
    ///
    /// Two requests from the same buyer can both miss on `find`; the loser's
    /// `create` fails with a conflict, which is treated as "someone else
    /// created it" and resolved by reading again.
    async fn find_or_create(&self, key: &ConversationKey) -> Result<Conversation, DomainError> {
        if let Some(existing) = self.store.find(key).await? {
            return Ok(existing);
        }

        match self.store.create(key).await {
            Ok(created) => {
                tracing::info!(
                    conversation_id = %created.id(),
                    product_id = %key.product_id,
                    buyer_id = %key.buyer_id,
                    "Conversation created"
                );
            }
            Err(e) if e.is_conflict() => {
                tracing::debug!(
                    product_id = %key.product_id,
                    buyer_id = %key.buyer_id,
                    "Concurrent create won; reading existing conversation"
                );
            }
            Err(e) => return Err(e),
        }

        self.store.find(key).await?.ok_or_else(|| {
            DomainError::new(
                ErrorCode::ConversationNotFound,
                format!(
                    "Conversation vanished after create for product {}",
                    key.product_id
                ),
            )
        })
    }

    async fn present(&self, conversation: Conversation) -> Result<ChatView, DomainError> {
        let (buyer, seller) = futures::try_join!(
            self.profile(conversation.buyer_id()),
            self.profile(conversation.seller_id()),
        )?;

        Ok(ChatView {
            conversation,
            buyer,
            seller,
        })
    }

    async fn profile(&self, id: &UserId) -> Result<UserProfile, DomainError> {
        self.users.find_profile(id).await?.ok_or_else(|| {
            DomainError::new(ErrorCode::UserNotFound, format!("User not found: {}", id))
        })
    }
}
