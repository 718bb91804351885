//! Mock session validator for testing.
//!
//! ```ignore
//! let validator = MockSessionValidator::new()
//!     .with_test_user("buyer-token", "buyer-1")
//!     .with_test_user("seller-token", "seller-1");
//! ```

use std::collections::HashMap;
use tokio::sync::RwLock;

use async_trait::async_trait;

use crate::domain::foundation::{AuthError, AuthenticatedUser, UserId};
use crate::ports::SessionValidator;

/// Stores a map of tokens to users. Tokens not in the map return `InvalidToken`.
#[derive(Debug, Default)]
pub struct MockSessionValidator {
    tokens: RwLock<HashMap<String, AuthenticatedUser>>,
    /// Returned for every validation when set.
    force_error: Option<AuthError>,
}

impl MockSessionValidator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a valid token that maps to a user.
    pub fn with_user(mut self, token: impl Into<String>, user: AuthenticatedUser) -> Self {
        self.tokens.get_mut().insert(token.into(), user);
        self
    }

    /// Adds a valid token for a user with a generated email and name.
    ///
    /// Returns the validator unchanged if `user_id` is blank.
    pub fn with_test_user(self, token: impl Into<String>, user_id: impl AsRef<str>) -> Self {
        let Ok(id) = UserId::new(user_id.as_ref()) else {
            return self;
        };
        let user = AuthenticatedUser::new(
            id.clone(),
            format!("{}@test.example.com", id),
            Some(format!("Test User {}", id)),
        );
        self.with_user(token, user)
    }

    /// Forces all validations to return the specified error.
    pub fn with_error(mut self, error: AuthError) -> Self {
        self.force_error = Some(error);
        self
    }

    /// Registers a new valid token at runtime.
    pub async fn add_token(&self, token: impl Into<String>, user: AuthenticatedUser) {
        self.tokens.write().await.insert(token.into(), user);
    }

    /// Removes a token, making it invalid.
    pub async fn remove_token(&self, token: &str) {
        self.tokens.write().await.remove(token);
    }
}

#[async_trait]
impl SessionValidator for MockSessionValidator {
    async fn validate(&self, token: &str) -> Result<AuthenticatedUser, AuthError> {
        if let Some(error) = &self.force_error {
            return Err(error.clone());
        }

        self.tokens
            .read()
            .await
            .get(token)
            .cloned()
            .ok_or(AuthError::InvalidToken)
    }
}
