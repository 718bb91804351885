//! RelayMessageHandler - persists a live message and fans it out.
//!
//! A message is only broadcast after it has been appended to the store, so
//! every message a client sees on the socket is also in the history a later
//! REST fetch returns, in the same order.
//!
//! Append and broadcast for one room run under that room's lock, so live
//! delivery order always matches commit order even when store calls are
//! slow to return.

use std::collections::HashMap;
use std::sync::Arc;

use thiserror::Error;
use tokio::sync::Mutex;

use crate::domain::chat::{Conversation, ConversationKey, Message, MessageContent, RoomId};
use crate::domain::foundation::{DomainError, ProductId, UserId};
use crate::domain::marketplace::ParticipantRole;
use crate::ports::{ChatBroadcaster, ConversationStore, ProductReader};

/// A `send-message` event from an authenticated channel.
///
/// Ids arrive as raw client strings; they are parsed here so that every
/// rejection goes through [`RelayError`].
#[derive(Debug, Clone)]
pub struct RelayMessageCommand {
    /// Identity bound to the channel at handshake.
    pub sender: UserId,
    pub product_id: String,
    /// Required when the sender is the seller; ignored for buyers.
    pub buyer_id: Option<String>,
    pub content: String,
}

/// What happened to a relayed message.
#[derive(Debug, Clone)]
pub struct RelayOutcome {
    pub message: Message,
    pub room: RoomId,
    /// Number of channels the message was handed to.
    pub delivered: usize,
}

/// Reasons a live message was dropped.
#[derive(Debug, Error)]
pub enum RelayError {
    #[error("message content is empty")]
    EmptyContent,

    #[error("invalid product id: {0}")]
    InvalidProduct(String),

    #[error("product not found: {0}")]
    ProductNotFound(ProductId),

    #[error("seller must name the buyer they are replying to")]
    InvalidBuyer,

    #[error("no conversation between this buyer and seller")]
    NoConversation,

    #[error(transparent)]
    Store(#[from] DomainError),
}

impl RelayError {
    /// Stable machine-readable code, sent on error events when enabled.
    pub fn code(&self) -> &'static str {
        match self {
            RelayError::EmptyContent => "EMPTY_CONTENT",
            RelayError::InvalidProduct(_) => "INVALID_PRODUCT",
            RelayError::ProductNotFound(_) => "PRODUCT_NOT_FOUND",
            RelayError::InvalidBuyer => "INVALID_BUYER",
            RelayError::NoConversation => "NO_CONVERSATION",
            RelayError::Store(_) => "STORE_ERROR",
        }
    }
}

pub struct RelayMessageHandler {
    products: Arc<dyn ProductReader>,
    store: Arc<dyn ConversationStore>,
    broadcaster: Arc<dyn ChatBroadcaster>,
    room_locks: Mutex<HashMap<RoomId, Arc<Mutex<()>>>>,
}

impl RelayMessageHandler {
    pub fn new(
        products: Arc<dyn ProductReader>,
        store: Arc<dyn ConversationStore>,
        broadcaster: Arc<dyn ChatBroadcaster>,
    ) -> Self {
        Self {
            products,
            store,
            broadcaster,
            room_locks: Mutex::new(HashMap::new()),
        }
    }

    /// Validate, persist, then broadcast.
    ///
    /// The conversation must already exist: a buyer creates it by opening
    /// the chat over REST first. Nothing is persisted or broadcast when this
    /// returns an error.
    pub async fn handle(&self, cmd: RelayMessageCommand) -> Result<RelayOutcome, RelayError> {
        let content = MessageContent::new(&cmd.content).map_err(|_| RelayError::EmptyContent)?;

        let product_id: ProductId = cmd
            .product_id
            .parse()
            .map_err(|_| RelayError::InvalidProduct(cmd.product_id.clone()))?;

        let product = self
            .products
            .find_product(&product_id)
            .await?
            .ok_or(RelayError::ProductNotFound(product_id))?;

        let key = match product.role_of(&cmd.sender) {
            ParticipantRole::Seller => {
                let buyer_id = cmd
                    .buyer_id
                    .as_deref()
                    .and_then(|raw| UserId::new(raw).ok())
                    .ok_or(RelayError::InvalidBuyer)?;
                ConversationKey::new(product_id, buyer_id, cmd.sender.clone())
                    .map_err(|_| RelayError::InvalidBuyer)?
            }
            ParticipantRole::Buyer => {
                ConversationKey::new(product_id, cmd.sender.clone(), product.owner_id().clone())?
            }
        };

        let room = key.room_id();
        let room_lock = self.room_lock(&room).await;
        let result = {
            let _ordered = room_lock.lock().await;
            self.append_and_broadcast(&key, &room, &cmd.sender, content)
                .await
        };
        self.release_room_lock(&room, room_lock).await;
        let (conversation, message, delivered) = result?;

        tracing::debug!(
            conversation_id = %conversation.id(),
            message_id = %message.id,
            room = %room,
            delivered,
            "Message relayed"
        );

        Ok(RelayOutcome {
            message,
            room,
            delivered,
        })
    }

    async fn append_and_broadcast(
        &self,
        key: &ConversationKey,
        room: &RoomId,
        sender: &UserId,
        content: MessageContent,
    ) -> Result<(Conversation, Message, usize), RelayError> {
        let conversation = self
            .store
            .find(key)
            .await?
            .ok_or(RelayError::NoConversation)?;

        let message = self
            .store
            .append_message(conversation.id(), sender, content)
            .await?;

        let delivered = self.broadcaster.broadcast(room, &message).await;
        Ok((conversation, message, delivered))
    }

    async fn room_lock(&self, room: &RoomId) -> Arc<Mutex<()>> {
        self.room_locks
            .lock()
            .await
            .entry(room.clone())
            .or_default()
            .clone()
    }

    /// Drops the room's lock entry once no other relay holds or awaits it.
    async fn release_room_lock(&self, room: &RoomId, lock: Arc<Mutex<()>>) {
        let mut locks = self.room_locks.lock().await;
        // One reference in the map, one here.
        if Arc::strong_count(&lock) == 2 {
            locks.remove(room);
        }
    }

    #[cfg(test)]
    async fn tracked_rooms(&self) -> usize {
        self.room_locks.lock().await.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::memory::{InMemoryCatalog, InMemoryConversationStore};
    use crate::domain::marketplace::Product;
    use async_trait::async_trait;
    use tokio::sync::Mutex;

    #[derive(Default)]
    struct RecordingBroadcaster {
        sent: Mutex<Vec<(RoomId, Message)>>,
    }

    #[async_trait]
    impl ChatBroadcaster for RecordingBroadcaster {
        async fn broadcast(&self, room: &RoomId, message: &Message) -> usize {
            self.sent.lock().await.push((room.clone(), message.clone()));
            1
        }
    }

    struct Fixture {
        product_id: ProductId,
        seller: UserId,
        buyer: UserId,
        store: Arc<InMemoryConversationStore>,
        broadcaster: Arc<RecordingBroadcaster>,
        handler: RelayMessageHandler,
    }

    fn fixture() -> Fixture {
        let seller = UserId::new("seller-1").unwrap();
        let buyer = UserId::new("buyer-1").unwrap();
        let product_id = ProductId::new();
        let catalog = Arc::new(
            InMemoryCatalog::new().with_product(Product::new(product_id, seller.clone(), "Chair")),
        );
        let store = Arc::new(InMemoryConversationStore::new());
        let broadcaster = Arc::new(RecordingBroadcaster::default());
        let handler = RelayMessageHandler::new(catalog, store.clone(), broadcaster.clone());
        Fixture {
            product_id,
            seller,
            buyer,
            store,
            broadcaster,
            handler,
        }
    }

    async fn open(f: &Fixture) {
        let key = ConversationKey::new(f.product_id, f.buyer.clone(), f.seller.clone()).unwrap();
        f.store.create(&key).await.unwrap();
    }

    fn from_buyer(f: &Fixture, content: &str) -> RelayMessageCommand {
        RelayMessageCommand {
            sender: f.buyer.clone(),
            product_id: f.product_id.to_string(),
            buyer_id: None,
            content: content.to_string(),
        }
    }

    fn from_seller(f: &Fixture, buyer_id: Option<&str>, content: &str) -> RelayMessageCommand {
        RelayMessageCommand {
            sender: f.seller.clone(),
            product_id: f.product_id.to_string(),
            buyer_id: buyer_id.map(str::to_string),
            content: content.to_string(),
        }
    }

    async fn history(f: &Fixture) -> Vec<String> {
        let key = ConversationKey::new(f.product_id, f.buyer.clone(), f.seller.clone()).unwrap();
        f.store
            .find(&key)
            .await
            .unwrap()
            .unwrap()
            .messages()
            .iter()
            .map(|m| m.content.as_str().to_string())
            .collect()
    }

    #[tokio::test]
    async fn buyer_message_is_stored_then_broadcast_to_conversation_room() {
        let f = fixture();
        open(&f).await;

        let outcome = f.handler.handle(from_buyer(&f, "Hi")).await.unwrap();

        assert_eq!(outcome.room, RoomId::for_conversation(&f.product_id, &f.buyer));
        assert_eq!(outcome.message.sender_id, f.buyer);
        assert_eq!(history(&f).await, vec!["Hi"]);
        let sent = f.broadcaster.sent.lock().await;
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].1.id, outcome.message.id);
    }

    #[tokio::test]
    async fn seller_reply_lands_in_the_buyers_room() {
        let f = fixture();
        open(&f).await;

        let outcome = f
            .handler
            .handle(from_seller(&f, Some("buyer-1"), "Hello"))
            .await
            .unwrap();

        assert_eq!(outcome.room, RoomId::for_conversation(&f.product_id, &f.buyer));
        assert_eq!(outcome.message.sender_id, f.seller);
    }

    #[tokio::test]
    async fn seller_buyer_id_is_normalized() {
        let f = fixture();
        open(&f).await;
        f.handler
            .handle(from_seller(&f, Some("  BUYER-1 "), "Hello"))
            .await
            .unwrap();
        assert_eq!(history(&f).await, vec!["Hello"]);
    }

    #[tokio::test]
    async fn messages_are_stored_in_relay_order() {
        let f = fixture();
        open(&f).await;

        f.handler.handle(from_buyer(&f, "Hi")).await.unwrap();
        f.handler.handle(from_seller(&f, Some("buyer-1"), "Hello")).await.unwrap();
        f.handler.handle(from_buyer(&f, "Still available?")).await.unwrap();

        assert_eq!(history(&f).await, vec!["Hi", "Hello", "Still available?"]);
        let sent: Vec<_> = f
            .broadcaster
            .sent
            .lock()
            .await
            .iter()
            .map(|(_, m)| m.content.as_str().to_string())
            .collect();
        assert_eq!(sent, vec!["Hi", "Hello", "Still available?"]);
    }

    #[tokio::test]
    async fn whitespace_only_content_is_dropped() {
        let f = fixture();
        open(&f).await;
        let err = f.handler.handle(from_buyer(&f, "   ")).await.unwrap_err();
        assert!(matches!(err, RelayError::EmptyContent));
        assert!(history(&f).await.is_empty());
        assert!(f.broadcaster.sent.lock().await.is_empty());
    }

    #[tokio::test]
    async fn malformed_product_id_is_rejected() {
        let f = fixture();
        let mut cmd = from_buyer(&f, "Hi");
        cmd.product_id = "not-a-product".into();
        let err = f.handler.handle(cmd).await.unwrap_err();
        assert!(matches!(err, RelayError::InvalidProduct(_)));
        assert_eq!(err.code(), "INVALID_PRODUCT");
    }

    #[tokio::test]
    async fn unknown_product_is_rejected() {
        let f = fixture();
        let mut cmd = from_buyer(&f, "Hi");
        cmd.product_id = ProductId::new().to_string();
        let err = f.handler.handle(cmd).await.unwrap_err();
        assert!(matches!(err, RelayError::ProductNotFound(_)));
    }

    #[tokio::test]
    async fn seller_without_buyer_id_is_rejected() {
        let f = fixture();
        open(&f).await;
        let err = f.handler.handle(from_seller(&f, None, "Hello")).await.unwrap_err();
        assert!(matches!(err, RelayError::InvalidBuyer));
    }

    #[tokio::test]
    async fn seller_naming_themselves_is_rejected() {
        let f = fixture();
        let err = f
            .handler
            .handle(from_seller(&f, Some("seller-1"), "Hello"))
            .await
            .unwrap_err();
        assert!(matches!(err, RelayError::InvalidBuyer));
    }

    #[tokio::test]
    async fn message_before_conversation_exists_is_dropped() {
        let f = fixture();
        let err = f.handler.handle(from_buyer(&f, "Hi")).await.unwrap_err();
        assert!(matches!(err, RelayError::NoConversation));
        assert!(f.broadcaster.sent.lock().await.is_empty());
        assert!(f
            .store
            .list_for_seller(&f.seller, &f.product_id)
            .await
            .unwrap()
            .is_empty());
    }

    #[tokio::test]
    async fn seller_cannot_start_a_conversation() {
        let f = fixture();
        let err = f
            .handler
            .handle(from_seller(&f, Some("buyer-1"), "Interested?"))
            .await
            .unwrap_err();
        assert!(matches!(err, RelayError::NoConversation));
    }

    /// Commits immediately but returns late for messages reading "first".
    struct SlowAckStore {
        inner: InMemoryConversationStore,
        committed: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl ConversationStore for SlowAckStore {
        async fn find(&self, key: &ConversationKey) -> Result<Option<Conversation>, DomainError> {
            self.inner.find(key).await
        }

        async fn create(&self, key: &ConversationKey) -> Result<Conversation, DomainError> {
            self.inner.create(key).await
        }

        async fn append_message(
            &self,
            conversation_id: &crate::domain::foundation::ConversationId,
            sender_id: &UserId,
            content: MessageContent,
        ) -> Result<Message, DomainError> {
            let slow = content.as_str() == "first";
            let message = self
                .inner
                .append_message(conversation_id, sender_id, content)
                .await?;
            self.committed
                .lock()
                .await
                .push(message.content.as_str().to_string());
            if slow {
                tokio::time::sleep(std::time::Duration::from_millis(50)).await;
            }
            Ok(message)
        }

        async fn list_for_seller(
            &self,
            seller_id: &UserId,
            product_id: &ProductId,
        ) -> Result<Vec<Conversation>, DomainError> {
            self.inner.list_for_seller(seller_id, product_id).await
        }
    }

    #[tokio::test]
    async fn broadcast_order_follows_commit_order_when_store_acks_late() {
        let seller = UserId::new("seller-1").unwrap();
        let buyer = UserId::new("buyer-1").unwrap();
        let product_id = ProductId::new();
        let catalog = Arc::new(
            InMemoryCatalog::new().with_product(Product::new(product_id, seller.clone(), "Chair")),
        );
        let store = Arc::new(SlowAckStore {
            inner: InMemoryConversationStore::new(),
            committed: Mutex::new(Vec::new()),
        });
        let key = ConversationKey::new(product_id, buyer.clone(), seller.clone()).unwrap();
        store.create(&key).await.unwrap();
        let broadcaster = Arc::new(RecordingBroadcaster::default());
        let handler = Arc::new(RelayMessageHandler::new(
            catalog,
            store.clone(),
            broadcaster.clone(),
        ));

        let first = {
            let handler = handler.clone();
            let cmd = RelayMessageCommand {
                sender: buyer.clone(),
                product_id: product_id.to_string(),
                buyer_id: None,
                content: "first".into(),
            };
            tokio::spawn(async move { handler.handle(cmd).await })
        };
        tokio::time::sleep(std::time::Duration::from_millis(10)).await;
        let second = handler.handle(RelayMessageCommand {
            sender: seller.clone(),
            product_id: product_id.to_string(),
            buyer_id: Some("buyer-1".into()),
            content: "second".into(),
        });
        let (first, second) = tokio::join!(first, second);
        first.unwrap().unwrap();
        second.unwrap();

        let committed = store.committed.lock().await.clone();
        let broadcast: Vec<_> = broadcaster
            .sent
            .lock()
            .await
            .iter()
            .map(|(_, m)| m.content.as_str().to_string())
            .collect();
        assert_eq!(committed, vec!["first", "second"]);
        assert_eq!(broadcast, committed);
    }

    #[tokio::test]
    async fn room_locks_are_released_after_relay() {
        let f = fixture();
        open(&f).await;
        f.handler.handle(from_buyer(&f, "Hi")).await.unwrap();
        f.handler.handle(from_buyer(&f, "   ")).await.unwrap_err();
        f.handler.handle(from_seller(&f, Some("buyer-1"), "Hello")).await.unwrap();
        assert_eq!(f.handler.tracked_rooms().await, 0);
    }
}
