//! Public projection of a user account.

use serde::{Deserialize, Serialize};

use crate::domain::foundation::UserId;

/// The `{id, name, email}` projection used to present chat participants.
///
/// Credentials never leave the account store; this is all chat ever sees.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: UserId,
    pub name: String,
    pub email: String,
}

impl UserProfile {
    pub fn new(id: UserId, name: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            email: email.into(),
        }
    }
}
