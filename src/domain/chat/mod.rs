//! Chat module - conversations between a product's seller and its buyers.
//!
//! - `conversation` - the aggregate and its three-way key
//! - `message` - immutable messages and validated content
//! - `room` - canonical names for live broadcast rooms

mod conversation;
mod message;
mod room;

pub use conversation::{Conversation, ConversationKey};
pub use message::{Message, MessageContent};
pub use room::RoomId;
