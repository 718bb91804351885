//! Room naming for live broadcast groups.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::domain::foundation::{ProductId, UserId};

/// Name of a live broadcast group.
///
/// A conversation's room is always derived from `(product, buyer)` and never
/// from the seller. The seller joins with the buyer's id as disambiguator,
/// so both participants land in the same room. The wire form is the product
/// id immediately followed by the buyer id, which is what clients send in
/// `join-chat`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RoomId(String);

impl RoomId {
    /// The canonical room for a product/buyer pair.
    pub fn for_conversation(product_id: &ProductId, buyer_id: &UserId) -> Self {
        Self(format!("{}{}", product_id, buyer_id))
    }

    /// A room name supplied by a client. Normalized the same way ids are.
    pub fn from_client(raw: &str) -> Option<Self> {
        let canonical = UserId::canonicalize(raw);
        if canonical.is_empty() {
            None
        } else {
            Some(Self(canonical))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RoomId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
