//! Ports - Interfaces for external dependencies.
//!
//! Following hexagonal architecture, ports define the contracts between
//! the domain and the outside world. Adapters implement these ports.
//!
//! ## Persistence
//!
//! - `ConversationStore` - Conversations and their message logs
//!
//! ## Collaborators
//!
//! - `ProductReader` - Product existence and ownership
//! - `UserReader` - Participant profiles
//! - `SessionValidator` - Session token to user identity
//!
//! ## Realtime
//!
//! - `ChatBroadcaster` - Fan-out of stored messages to live rooms

mod catalog;
mod chat_broadcaster;
mod conversation_store;
mod session_validator;

pub use catalog::{ProductReader, UserReader};
pub use chat_broadcaster::ChatBroadcaster;
pub use conversation_store::ConversationStore;
pub use session_validator::SessionValidator;
