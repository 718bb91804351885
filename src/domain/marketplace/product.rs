//! Product listing and caller role classification.

use serde::{Deserialize, Serialize};

use crate::domain::foundation::{ProductId, UserId};

/// Role the caller plays with respect to a product.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParticipantRole {
    /// The caller owns the listing.
    Seller,
    /// Anyone else; a prospective buyer.
    Buyer,
}

/// A product listing, owned by exactly one seller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    id: ProductId,
    owner_id: UserId,
    title: String,
}

impl Product {
    /// Creates a product view.
    pub fn new(id: ProductId, owner_id: UserId, title: impl Into<String>) -> Self {
        Self {
            id,
            owner_id,
            title: title.into(),
        }
    }

    /// Returns the product ID.
    pub fn id(&self) -> &ProductId {
        &self.id
    }

    /// Returns the seller's user ID.
    pub fn owner_id(&self) -> &UserId {
        &self.owner_id
    }

    /// Returns the listing title.
    pub fn title(&self) -> &str {
        &self.title
    }

    /// Classifies `caller` as this product's seller or a buyer.
    ///
    /// Both ids are held in canonical form, so equality here is a
    /// normalized string comparison regardless of where each id came from.
    pub fn role_of(&self, caller: &UserId) -> ParticipantRole {
        if self.owner_id == *caller {
            ParticipantRole::Seller
        } else {
            ParticipantRole::Buyer
        }
    }
}
