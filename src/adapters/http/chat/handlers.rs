//! HTTP handlers for chat endpoints.

use std::sync::Arc;

use axum::extract::{Json, Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

use crate::adapters::http::middleware::RequireAuth;
use crate::application::handlers::chat::{
    ListSellerConversationsHandler, ListSellerConversationsQuery, ResolveConversationHandler,
    ResolveConversationQuery,
};
use crate::domain::foundation::{DomainError, ErrorCategory, ProductId, UserId};

use super::dto::{ChatListResponse, ChatQuery, ChatResponse, ChatSummaryDto, ErrorResponse};

// ════════════════════════════════════════════════════════════════════════════════
// Handler state
// ════════════════════════════════════════════════════════════════════════════════

#[derive(Clone)]
pub struct ChatHandlers {
    resolve_handler: Arc<ResolveConversationHandler>,
    list_handler: Arc<ListSellerConversationsHandler>,
}

impl ChatHandlers {
    pub fn new(
        resolve_handler: Arc<ResolveConversationHandler>,
        list_handler: Arc<ListSellerConversationsHandler>,
    ) -> Self {
        Self {
            resolve_handler,
            list_handler,
        }
    }
}

// ════════════════════════════════════════════════════════════════════════════════
// GET /api/chats/:product_id
// ════════════════════════════════════════════════════════════════════════════════

/// GET /api/chats/:product_id[?buyerId=] - Open the caller's conversation.
///
/// Buyers get their conversation with the seller, created on first fetch.
/// Sellers name the buyer with `buyerId` and get `chat: null` if that buyer
/// has not written yet.
///
/// # Errors
/// - 400 Bad Request: malformed ids, or a seller without `buyerId`
/// - 401 Unauthorized: no valid session
/// - 404 Not Found: product or participant does not exist
pub async fn get_chat(
    State(handlers): State<ChatHandlers>,
    RequireAuth(user): RequireAuth,
    Path(product_id): Path<String>,
    Query(params): Query<ChatQuery>,
) -> Result<impl IntoResponse, ChatApiError> {
    let product_id = parse_product_id(&product_id)?;
    let counterpart = params
        .buyer_id
        .as_deref()
        .filter(|raw| !raw.trim().is_empty())
        .map(UserId::new)
        .transpose()
        .map_err(|_| ChatApiError::BadRequest("Invalid buyerId".to_string()))?;

    let view = handlers
        .resolve_handler
        .handle(ResolveConversationQuery {
            caller: user.id,
            product_id,
            counterpart,
        })
        .await?;

    Ok((
        StatusCode::OK,
        Json(ChatResponse {
            success: true,
            chat: view.map(Into::into),
        }),
    ))
}

// ════════════════════════════════════════════════════════════════════════════════
// GET /api/products/:product_id/chats
// ════════════════════════════════════════════════════════════════════════════════

/// GET /api/products/:product_id/chats - The seller's inbox for a product.
///
/// # Errors
/// - 401 Unauthorized: no valid session
/// - 403 Forbidden: caller does not own the product
/// - 404 Not Found: product does not exist
pub async fn list_product_chats(
    State(handlers): State<ChatHandlers>,
    RequireAuth(user): RequireAuth,
    Path(product_id): Path<String>,
) -> Result<impl IntoResponse, ChatApiError> {
    let product_id = parse_product_id(&product_id)?;

    let summaries = handlers
        .list_handler
        .handle(ListSellerConversationsQuery {
            caller: user.id,
            product_id,
        })
        .await?;

    Ok((
        StatusCode::OK,
        Json(ChatListResponse {
            success: true,
            chats: summaries.into_iter().map(ChatSummaryDto::from).collect(),
        }),
    ))
}

fn parse_product_id(raw: &str) -> Result<ProductId, ChatApiError> {
    raw.parse()
        .map_err(|_| ChatApiError::BadRequest("Invalid product ID format".to_string()))
}

// ════════════════════════════════════════════════════════════════════════════════
// Error Handling
// ════════════════════════════════════════════════════════════════════════════════

/// API error type that converts domain errors to HTTP responses.
#[derive(Debug)]
pub enum ChatApiError {
    BadRequest(String),
    NotFound(String),
    Conflict(String),
    Forbidden(String),
    Internal(String),
}

impl From<DomainError> for ChatApiError {
    fn from(error: DomainError) -> Self {
        match error.category() {
            ErrorCategory::Validation => ChatApiError::BadRequest(error.message),
            ErrorCategory::NotFound => ChatApiError::NotFound(error.message),
            ErrorCategory::Conflict => ChatApiError::Conflict(error.message),
            ErrorCategory::Authorization | ErrorCategory::Authentication => {
                ChatApiError::Forbidden(error.message)
            }
            ErrorCategory::Internal => ChatApiError::Internal(error.to_string()),
        }
    }
}

impl IntoResponse for ChatApiError {
    fn into_response(self) -> Response {
        let (status, error) = match self {
            ChatApiError::BadRequest(msg) => {
                (StatusCode::BAD_REQUEST, ErrorResponse::new("BAD_REQUEST", msg))
            }
            ChatApiError::NotFound(msg) => {
                (StatusCode::NOT_FOUND, ErrorResponse::new("NOT_FOUND", msg))
            }
            ChatApiError::Conflict(msg) => {
                (StatusCode::CONFLICT, ErrorResponse::new("CONFLICT", msg))
            }
            ChatApiError::Forbidden(msg) => {
                (StatusCode::FORBIDDEN, ErrorResponse::new("FORBIDDEN", msg))
            }
            ChatApiError::Internal(msg) => {
                tracing::error!("Internal error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ErrorResponse::new("INTERNAL_ERROR", "An internal error occurred"),
                )
            }
        };

        (status, Json(error)).into_response()
    }
}
