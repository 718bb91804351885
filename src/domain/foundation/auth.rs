//! Authentication types for the domain layer.
//!
//! An `AuthenticatedUser` is what a validated session token resolves to.
//! Both the REST middleware and the realtime channel gate produce this same
//! type through the `SessionValidator` port, so a socket and a request made
//! with the same token always act as the same user.

use super::UserId;
use thiserror::Error;

/// Authenticated user extracted from a validated session token.
#[derive(Debug, Clone)]
pub struct AuthenticatedUser {
    /// The canonical user identifier.
    pub id: UserId,

    /// User's email address from the session claims.
    pub email: String,

    /// Display name if the session carries one.
    pub display_name: Option<String>,
}

impl AuthenticatedUser {
    /// Creates a new authenticated user.
    pub fn new(id: UserId, email: impl Into<String>, display_name: Option<String>) -> Self {
        Self {
            id,
            email: email.into(),
            display_name,
        }
    }

    /// Returns the user's display name, or email as fallback.
    pub fn display_name_or_email(&self) -> &str {
        self.display_name.as_deref().unwrap_or(&self.email)
    }
}

/// Authentication errors that can occur during token validation.
#[derive(Debug, Clone, Error)]
pub enum AuthError {
    /// No session token was presented.
    #[error("Missing session token")]
    MissingToken,

    /// The token is malformed or has an invalid signature.
    #[error("Invalid or expired token")]
    InvalidToken,

    /// The token has expired.
    #[error("Token expired")]
    TokenExpired,

    /// The session store could not be reached.
    #[error("Auth service unavailable: {0}")]
    ServiceUnavailable(String),
}

impl AuthError {
    /// Creates a service unavailable error with a message.
    pub fn service_unavailable(message: impl Into<String>) -> Self {
        Self::ServiceUnavailable(message.into())
    }

    /// Returns true if this error indicates the user should sign in again.
    pub fn requires_reauthentication(&self) -> bool {
        matches!(
            self,
            AuthError::MissingToken | AuthError::InvalidToken | AuthError::TokenExpired
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_user_id() -> UserId {
        UserId::new("user-123").unwrap()
    }

    #[test]
    fn authenticated_user_new_creates_user() {
        let user = AuthenticatedUser::new(
            test_user_id(),
            "test@example.com",
            Some("Test User".to_string()),
        );

        assert_eq!(user.id.as_str(), "user-123");
        assert_eq!(user.email, "test@example.com");
        assert_eq!(user.display_name, Some("Test User".to_string()));
    }

    #[test]
    fn display_name_or_email_falls_back_to_email() {
        let user = AuthenticatedUser::new(test_user_id(), "bob@example.com", None);
        assert_eq!(user.display_name_or_email(), "bob@example.com");
    }

    #[test]
    fn auth_error_service_unavailable_displays_message() {
        let err = AuthError::service_unavailable("Connection refused");
        assert_eq!(format!("{}", err), "Auth service unavailable: Connection refused");
    }

    #[test]
    fn auth_error_requires_reauthentication_for_token_errors() {
        assert!(AuthError::MissingToken.requires_reauthentication());
        assert!(AuthError::InvalidToken.requires_reauthentication());
        assert!(AuthError::TokenExpired.requires_reauthentication());
        assert!(!AuthError::service_unavailable("").requires_reauthentication());
    }
}
