//! Foundation module - Shared domain primitives.
//!
//! Contains value objects, identifiers, and error types that form the
//! vocabulary of the marketplace domain.

mod auth;
mod errors;
mod ids;
mod timestamp;

pub use auth::{AuthError, AuthenticatedUser};
pub use errors::{DomainError, ErrorCategory, ErrorCode, ValidationError};
pub use ids::{ConversationId, MessageId, ProductId, UserId};
pub use timestamp::Timestamp;
