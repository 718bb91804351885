//! PostgreSQL implementation of ConversationStore.
//!
//! Conversations live in `conversations`, their logs in `chat_messages`.
//! Message order is the per-conversation `sequence` column, assigned while
//! the parent row is locked, so two concurrent appends can never share a
//! position.

use async_trait::async_trait;
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};
use std::collections::HashMap;

use crate::domain::chat::{Conversation, ConversationKey, Message, MessageContent};
use crate::domain::foundation::{
    ConversationId, DomainError, ErrorCode, MessageId, ProductId, Timestamp, UserId,
};
use crate::ports::ConversationStore;

/// PostgreSQL implementation of ConversationStore.
#[derive(Clone)]
pub struct PostgresConversationStore {
    pool: PgPool,
}

impl PostgresConversationStore {
    /// Creates a new PostgresConversationStore.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn load_messages(
        &self,
        ids: &[uuid::Uuid],
    ) -> Result<HashMap<uuid::Uuid, Vec<Message>>, DomainError> {
        let rows = sqlx::query(
            r#"
            SELECT id, conversation_id, sender_id, content, created_at
            FROM chat_messages
            WHERE conversation_id = ANY($1)
            ORDER BY conversation_id, sequence ASC
            "#,
        )
        .bind(ids)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| DomainError::database(format!("Failed to fetch messages: {}", e)))?;

        let mut by_conversation: HashMap<uuid::Uuid, Vec<Message>> = HashMap::new();
        for row in rows {
            let conversation_id: uuid::Uuid = row.get("conversation_id");
            by_conversation
                .entry(conversation_id)
                .or_default()
                .push(row_to_message(&row)?);
        }
        Ok(by_conversation)
    }

    async fn hydrate(&self, rows: Vec<PgRow>) -> Result<Vec<Conversation>, DomainError> {
        let ids: Vec<uuid::Uuid> = rows.iter().map(|row| row.get("id")).collect();
        let mut messages = if ids.is_empty() {
            HashMap::new()
        } else {
            self.load_messages(&ids).await?
        };

        rows.iter()
            .map(|row| {
                let id: uuid::Uuid = row.get("id");
                row_to_conversation(row, messages.remove(&id).unwrap_or_default())
            })
            .collect()
    }
}

#[async_trait]
impl ConversationStore for PostgresConversationStore {
    async fn find(&self, key: &ConversationKey) -> Result<Option<Conversation>, DomainError> {
        let row = sqlx::query(
            r#"
            SELECT id, product_id, buyer_id, seller_id, created_at, updated_at
            FROM conversations
            WHERE product_id = $1 AND buyer_id = $2 AND seller_id = $3
            "#,
        )
        .bind(key.product_id.as_uuid())
        .bind(key.buyer_id.as_str())
        .bind(key.seller_id.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| DomainError::database(format!("Failed to fetch conversation: {}", e)))?;

        let Some(row) = row else {
            return Ok(None);
        };

        Ok(self.hydrate(vec![row]).await?.pop())
    }

    async fn create(&self, key: &ConversationKey) -> Result<Conversation, DomainError> {
        let conversation = Conversation::start(key.clone());

        let result = sqlx::query(
            r#"
            INSERT INTO conversations (id, product_id, buyer_id, seller_id, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(conversation.id().as_uuid())
        .bind(key.product_id.as_uuid())
        .bind(key.buyer_id.as_str())
        .bind(key.seller_id.as_str())
        .bind(conversation.created_at().as_datetime())
        .bind(conversation.updated_at().as_datetime())
        .execute(&self.pool)
        .await;

        match result {
            Ok(_) => Ok(conversation),
            Err(sqlx::Error::Database(db_err)) if db_err.is_unique_violation() => {
                Err(DomainError::conflict(format!(
                    "Conversation already exists for product {} and buyer {}",
                    key.product_id, key.buyer_id
                )))
            }
            Err(e) => Err(DomainError::database(format!(
                "Failed to insert conversation: {}",
                e
            ))),
        }
    }

    async fn append_message(
        &self,
        conversation_id: &ConversationId,
        sender_id: &UserId,
        content: MessageContent,
    ) -> Result<Message, DomainError> {
        let message = Message::new(sender_id.clone(), content);

        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| DomainError::database(format!("Failed to start transaction: {}", e)))?;

        // Row lock serializes sequence assignment per conversation.
        let locked = sqlx::query("SELECT id FROM conversations WHERE id = $1 FOR UPDATE")
            .bind(conversation_id.as_uuid())
            .fetch_optional(&mut *tx)
            .await
            .map_err(|e| DomainError::database(format!("Failed to lock conversation: {}", e)))?;

        if locked.is_none() {
            return Err(DomainError::new(
                ErrorCode::ConversationNotFound,
                format!("Conversation not found: {}", conversation_id),
            ));
        }

        sqlx::query(
            r#"
            INSERT INTO chat_messages (id, conversation_id, sequence, sender_id, content, created_at)
            SELECT $1, $2, COALESCE(MAX(sequence), 0) + 1, $3, $4, $5
            FROM chat_messages
            WHERE conversation_id = $2
            "#,
        )
        .bind(message.id.as_uuid())
        .bind(conversation_id.as_uuid())
        .bind(message.sender_id.as_str())
        .bind(message.content.as_str())
        .bind(message.created_at.as_datetime())
        .execute(&mut *tx)
        .await
        .map_err(|e| DomainError::database(format!("Failed to insert message: {}", e)))?;

        sqlx::query(
            r#"
            UPDATE conversations SET updated_at = GREATEST(updated_at, $2)
            WHERE id = $1
            "#,
        )
        .bind(conversation_id.as_uuid())
        .bind(message.created_at.as_datetime())
        .execute(&mut *tx)
        .await
        .map_err(|e| {
            DomainError::database(format!("Failed to update conversation timestamp: {}", e))
        })?;

        tx.commit()
            .await
            .map_err(|e| DomainError::database(format!("Failed to commit transaction: {}", e)))?;

        Ok(message)
    }

    async fn list_for_seller(
        &self,
        seller_id: &UserId,
        product_id: &ProductId,
    ) -> Result<Vec<Conversation>, DomainError> {
        let rows = sqlx::query(
            r#"
            SELECT id, product_id, buyer_id, seller_id, created_at, updated_at
            FROM conversations
            WHERE seller_id = $1 AND product_id = $2
            ORDER BY updated_at DESC
            "#,
        )
        .bind(seller_id.as_str())
        .bind(product_id.as_uuid())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| DomainError::database(format!("Failed to list conversations: {}", e)))?;

        self.hydrate(rows).await
    }
}

// ───────────────────────────────────────────────────────────────
// Row mapping
// ───────────────────────────────────────────────────────────────

fn row_to_message(row: &PgRow) -> Result<Message, DomainError> {
    let id: uuid::Uuid = row.get("id");
    let sender_id: String = row.get("sender_id");
    let content: String = row.get("content");
    let created_at: chrono::DateTime<chrono::Utc> = row.get("created_at");

    Ok(Message {
        id: MessageId::from_uuid(id),
        sender_id: UserId::new(sender_id)?,
        content: MessageContent::new(content)?,
        created_at: Timestamp::from_datetime(created_at),
    })
}

fn row_to_conversation(row: &PgRow, messages: Vec<Message>) -> Result<Conversation, DomainError> {
    let id: uuid::Uuid = row.get("id");
    let product_id: uuid::Uuid = row.get("product_id");
    let buyer_id: String = row.get("buyer_id");
    let seller_id: String = row.get("seller_id");
    let created_at: chrono::DateTime<chrono::Utc> = row.get("created_at");
    let updated_at: chrono::DateTime<chrono::Utc> = row.get("updated_at");

    let key = ConversationKey::new(
        ProductId::from_uuid(product_id),
        UserId::new(buyer_id)?,
        UserId::new(seller_id)?,
    )?;

    Ok(Conversation::reconstitute(
        ConversationId::from_uuid(id),
        key,
        messages,
        Timestamp::from_datetime(created_at),
        Timestamp::from_datetime(updated_at),
    ))
}
