//! Read access to the marketplace catalog.
//!
//! Products and accounts are owned by other parts of the marketplace.
//! Chat only reads them: product ownership for role classification and
//! user profiles for presenting participants.

use async_trait::async_trait;

use crate::domain::foundation::{DomainError, ProductId, UserId};
use crate::domain::marketplace::{Product, UserProfile};

/// Looks up products by ID.
#[async_trait]
pub trait ProductReader: Send + Sync {
    /// Returns `None` if no such product exists.
    async fn find_product(&self, id: &ProductId) -> Result<Option<Product>, DomainError>;
}

/// Looks up public user profiles by ID.
#[async_trait]
pub trait UserReader: Send + Sync {
    /// Returns `None` if no such user exists.
    async fn find_profile(&self, id: &UserId) -> Result<Option<UserProfile>, DomainError>;
}
