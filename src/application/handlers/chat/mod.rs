//! Chat handlers.
//!
//! - `ResolveConversationHandler` - open a buyer/seller thread over REST
//! - `ListSellerConversationsHandler` - the seller's per-product inbox
//! - `RelayMessageHandler` - persist and fan out live messages

mod list_seller_conversations;
mod relay_message;
mod resolve_conversation;

pub use list_seller_conversations::{
    ConversationSummary, ListSellerConversationsHandler, ListSellerConversationsQuery,
};
pub use relay_message::{RelayError, RelayMessageCommand, RelayMessageHandler, RelayOutcome};
pub use resolve_conversation::{ChatView, ResolveConversationHandler, ResolveConversationQuery};
