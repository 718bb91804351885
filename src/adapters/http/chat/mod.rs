//! Chat REST endpoints.

pub mod dto;
mod handlers;
mod routes;

pub use handlers::{get_chat, list_product_chats, ChatApiError, ChatHandlers};
pub use routes::chat_routes;
