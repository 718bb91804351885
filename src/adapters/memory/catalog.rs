//! In-memory product and user catalog.

use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;

use crate::domain::foundation::{DomainError, ProductId, UserId};
use crate::domain::marketplace::{Product, UserProfile};
use crate::ports::{ProductReader, UserReader};

/// Implements both catalog ports over two maps.
///
/// ```ignore
/// let catalog = Arc::new(
///     InMemoryCatalog::new()
///         .with_product(product)
///         .with_user(seller_profile),
/// );
/// let handler = ResolveConversationHandler::new(catalog.clone(), catalog, store);
/// ```
#[derive(Default)]
pub struct InMemoryCatalog {
    products: RwLock<HashMap<ProductId, Product>>,
    users: RwLock<HashMap<UserId, UserProfile>>,
}

impl InMemoryCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    // === Builders ===

    pub fn with_product(mut self, product: Product) -> Self {
        self.products.get_mut().insert(*product.id(), product);
        self
    }

    pub fn with_user(mut self, profile: UserProfile) -> Self {
        self.users.get_mut().insert(profile.id.clone(), profile);
        self
    }

    // === Runtime mutation ===

    pub async fn add_product(&self, product: Product) {
        self.products.write().await.insert(*product.id(), product);
    }

    pub async fn add_user(&self, profile: UserProfile) {
        self.users.write().await.insert(profile.id.clone(), profile);
    }
}

#[async_trait]
impl ProductReader for InMemoryCatalog {
    async fn find_product(&self, id: &ProductId) -> Result<Option<Product>, DomainError> {
        Ok(self.products.read().await.get(id).cloned())
    }
}

#[async_trait]
impl UserReader for InMemoryCatalog {
    async fn find_profile(&self, id: &UserId) -> Result<Option<UserProfile>, DomainError> {
        Ok(self.users.read().await.get(id).cloned())
    }
}
