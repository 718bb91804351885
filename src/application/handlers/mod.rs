//! Application handlers.
//!
//! Command and query handlers that orchestrate domain operations.

pub mod chat;

pub use chat::{
    // Queries
    ChatView, ConversationSummary, ListSellerConversationsHandler, ListSellerConversationsQuery,
    ResolveConversationHandler, ResolveConversationQuery,
    // Commands
    RelayError, RelayMessageCommand, RelayMessageHandler, RelayOutcome,
};
