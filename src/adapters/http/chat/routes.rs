//! Axum routes for chat endpoints.

use axum::routing::get;
use axum::Router;

use super::handlers::{get_chat, list_product_chats, ChatHandlers};

/// Creates routes for chat endpoints.
///
/// - GET /chats/:product_id[?buyerId=] - Open a conversation
/// - GET /products/:product_id/chats - Seller's conversations for a product
pub fn chat_routes(handlers: ChatHandlers) -> Router {
    Router::new()
        .route("/chats/:product_id", get(get_chat))
        .route("/products/:product_id/chats", get(list_product_chats))
        .with_state(handlers)
}
