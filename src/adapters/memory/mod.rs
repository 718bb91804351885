//! In-memory adapters.
//!
//! Back the handler unit tests and the HTTP integration tests. State lives
//! as long as the adapter value does.

mod catalog;
mod conversation_store;

pub use catalog::InMemoryCatalog;
pub use conversation_store::InMemoryConversationStore;
