//! Application layer - Commands, Queries, and Handlers.
//!
//! This layer orchestrates domain operations and coordinates between ports.
//! Reads (resolving and listing conversations) and the single write path
//! (relaying a live message) are separate handlers.

pub mod handlers;

pub use handlers::{
    ChatView, ConversationSummary, ListSellerConversationsHandler, ListSellerConversationsQuery,
    RelayError, RelayMessageCommand, RelayMessageHandler, RelayOutcome,
    ResolveConversationHandler, ResolveConversationQuery,
};
