//! HTTP adapters - REST and websocket surface.
//!
//! `build_router` assembles the whole application:
//!
//! ```text
//! /health                          liveness check
//! /api/chats/:product_id           open a conversation   (session required)
//! /api/products/:product_id/chats  seller inbox          (session required)
//! /ws                              chat channel          (session checked before upgrade)
//! ```
//!
//! Middleware order, outermost first: request id, trace, CORS, then (REST
//! only) timeout, compression and session authentication.

pub mod chat;
pub mod middleware;

pub use chat::{chat_routes, ChatApiError, ChatHandlers};
pub use middleware::{auth_middleware, AuthRejection, AuthState, RequireAuth};

use std::sync::Arc;

use axum::{middleware::from_fn_with_state, routing::get, Router};
use http::{HeaderName, HeaderValue};
use tower_http::{
    compression::CompressionLayer,
    cors::{AllowOrigin, Any, CorsLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::adapters::websocket::{websocket_routes, RoomManager, WebSocketState};
use crate::application::handlers::chat::{
    ListSellerConversationsHandler, RelayMessageHandler, ResolveConversationHandler,
};
use crate::config::AppConfig;
use crate::ports::{ConversationStore, ProductReader, SessionValidator, UserReader};

const REQUEST_ID_HEADER: &str = "x-request-id";

/// The port implementations the server runs on.
#[derive(Clone)]
pub struct AppServices {
    pub products: Arc<dyn ProductReader>,
    pub users: Arc<dyn UserReader>,
    pub store: Arc<dyn ConversationStore>,
    pub sessions: Arc<dyn SessionValidator>,
    pub rooms: Arc<RoomManager>,
}

/// Builds the complete application router.
pub fn build_router(services: AppServices, config: &AppConfig) -> Router {
    let auth = AuthState::new(services.sessions.clone(), config.auth.session_cookie.clone());

    let chat = ChatHandlers::new(
        Arc::new(ResolveConversationHandler::new(
            services.products.clone(),
            services.users.clone(),
            services.store.clone(),
        )),
        Arc::new(ListSellerConversationsHandler::new(
            services.products.clone(),
            services.users.clone(),
            services.store.clone(),
        )),
    );

    let relay = Arc::new(RelayMessageHandler::new(
        services.products.clone(),
        services.store.clone(),
        services.rooms.clone(),
    ));

    let api = chat_routes(chat)
        .layer(from_fn_with_state(auth.clone(), auth_middleware))
        .layer(CompressionLayer::new())
        .layer(TimeoutLayer::new(config.server.request_timeout()));

    let realtime = websocket_routes(WebSocketState::new(
        services.rooms,
        relay,
        auth,
        config.realtime.clone(),
    ));

    let request_id = HeaderName::from_static(REQUEST_ID_HEADER);

    Router::new()
        .route("/health", get(health))
        .nest("/api", api)
        .merge(realtime)
        .layer(cors_layer(&config.server.cors_origins_list()))
        .layer(TraceLayer::new_for_http())
        .layer(PropagateRequestIdLayer::new(request_id.clone()))
        .layer(SetRequestIdLayer::new(request_id, MakeRequestUuid))
}

async fn health() -> &'static str {
    "ok"
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    let layer = CorsLayer::new().allow_methods(Any).allow_headers(Any);
    if origins.is_empty() {
        return layer.allow_origin(Any);
    }

    let parsed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match origin.parse() {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!(origin = %origin, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();
    layer.allow_origin(AllowOrigin::list(parsed))
}
