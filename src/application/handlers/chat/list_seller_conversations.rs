//! ListSellerConversationsHandler - the seller's inbox for one product.

use std::sync::Arc;

use crate::domain::chat::Message;
use crate::domain::foundation::{ConversationId, DomainError, ErrorCode, ProductId, Timestamp, UserId};
use crate::domain::marketplace::{ParticipantRole, UserProfile};
use crate::ports::{ConversationStore, ProductReader, UserReader};

/// Query for every conversation buyers have started on a product.
#[derive(Debug, Clone)]
pub struct ListSellerConversationsQuery {
    pub caller: UserId,
    pub product_id: ProductId,
}

/// One row of the seller's inbox.
#[derive(Debug, Clone)]
pub struct ConversationSummary {
    pub id: ConversationId,
    pub buyer: UserProfile,
    pub last_message: Option<Message>,
    pub message_count: usize,
    pub updated_at: Timestamp,
}

pub struct ListSellerConversationsHandler {
    products: Arc<dyn ProductReader>,
    users: Arc<dyn UserReader>,
    store: Arc<dyn ConversationStore>,
}

impl ListSellerConversationsHandler {
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

    /// Lists conversations most-recently-active first.
    ///
    /// Only the product's owner may list. Conversations whose buyer account
    /// no longer exists are left out.
    pub async fn handle(
        &self,
        query: ListSellerConversationsQuery,
    ) -> Result<Vec<ConversationSummary>, DomainError> {
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

        if product.role_of(&query.caller) != ParticipantRole::Seller {
            return Err(DomainError::forbidden(
                "Only the product's seller can list its conversations",
            ));
        }

        let mut conversations = self
            .store
            .list_for_seller(&query.caller, &query.product_id)
            .await?;
        conversations.sort_by(|a, b| b.updated_at().cmp(a.updated_at()));

        let mut summaries = Vec::with_capacity(conversations.len());
        for conversation in conversations {
            let Some(buyer) = self.users.find_profile(conversation.buyer_id()).await? else {
                tracing::warn!(
                    conversation_id = %conversation.id(),
                    buyer_id = %conversation.buyer_id(),
                    "Skipping conversation with unknown buyer"
                );
                continue;
            };

            summaries.push(ConversationSummary {
                id: *conversation.id(),
                buyer,
                last_message: conversation.last_message().cloned(),
                message_count: conversation.message_count(),
                updated_at: *conversation.updated_at(),
            });
        }

        Ok(summaries)
    }
}
