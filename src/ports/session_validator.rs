//! Session validation port.
//!
//! Resolves a session token to the user it was issued to. The HTTP
//! middleware and the realtime channel gate both go through this port, so
//! REST and socket traffic share one notion of identity.

use async_trait::async_trait;

use crate::domain::foundation::{AuthenticatedUser, AuthError};

/// Validates session tokens and extracts user identity.
///
/// # Contract
///
/// Implementations must:
/// - Return `AuthError::InvalidToken` for malformed or forged tokens
/// - Return `AuthError::TokenExpired` for expired tokens
/// - Return `AuthError::ServiceUnavailable` for transient errors
#[async_trait]
pub trait SessionValidator: Send + Sync {
    /// Validate a raw session token and return the authenticated user.
    async fn validate(&self, token: &str) -> Result<AuthenticatedUser, AuthError>;
}
