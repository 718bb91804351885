//! Domain layer containing business logic and domain types.
//!
//! # Module Organization
//!
//! - `foundation` - Shared domain primitives (value objects, IDs, errors)
//! - `marketplace` - Products and user profiles as chat sees them
//! - `chat` - Conversations, messages, and room naming

pub mod chat;
pub mod foundation;
pub mod marketplace;
