//! PostgreSQL read access to products and user profiles.
//!
//! User ids in `users` may be stored in any case. Lookups fold them with the
//! migration's `ascii_lower`, which folds exactly the letters
//! `UserId::canonicalize` folds, so non-ASCII capitals match byte for byte.

use async_trait::async_trait;
use sqlx::{PgPool, Row};

use crate::domain::foundation::{DomainError, ProductId, UserId};
use crate::domain::marketplace::{Product, UserProfile};
use crate::ports::{ProductReader, UserReader};

const FIND_PROFILE_SQL: &str = "SELECT id, name, email FROM users WHERE ascii_lower(id) = $1";

/// Implements ProductReader and UserReader over the marketplace tables.
#[derive(Clone)]
pub struct PostgresCatalog {
    pool: PgPool,
}

impl PostgresCatalog {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ProductReader for PostgresCatalog {
    async fn find_product(&self, id: &ProductId) -> Result<Option<Product>, DomainError> {
        let row = sqlx::query("SELECT id, owner_id, title FROM products WHERE id = $1")
            .bind(id.as_uuid())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| DomainError::database(format!("Failed to fetch product: {}", e)))?;

        let Some(row) = row else {
            return Ok(None);
        };

        let id: uuid::Uuid = row.get("id");
        let owner_id: String = row.get("owner_id");
        let title: String = row.get("title");

        Ok(Some(Product::new(
            ProductId::from_uuid(id),
            UserId::new(owner_id)?,
            title,
        )))
    }
}

#[async_trait]
impl UserReader for PostgresCatalog {
    async fn find_profile(&self, id: &UserId) -> Result<Option<UserProfile>, DomainError> {
        let row = sqlx::query(FIND_PROFILE_SQL)
            .bind(id.as_str())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| DomainError::database(format!("Failed to fetch user: {}", e)))?;

        let Some(row) = row else {
            return Ok(None);
        };

        let user_id: String = row.get("id");
        let name: String = row.get("name");
        let email: String = row.get("email");

        Ok(Some(UserProfile::new(UserId::new(user_id)?, name, email)))
    }
}
