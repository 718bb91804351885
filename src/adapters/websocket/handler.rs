//! Websocket upgrade handler and per-connection event loop.
//!
//! Connection lifecycle:
//! 1. Authenticate the upgrade request with the session token (401 otherwise)
//! 2. Upgrade to a websocket bound to that user
//! 3. Handle `join-chat` / `send-message` events in arrival order
//! 4. Forward room broadcasts from the channel's outbound queue
//! 5. Leave every room on disconnect

use std::sync::Arc;

use axum::{
    extract::{
        ws::{rejection::WebSocketUpgradeRejection, Message, WebSocket, WebSocketUpgrade},
        Query, State,
    },
    http::HeaderMap,
    response::{IntoResponse, Response},
};
use futures::{SinkExt, StreamExt};
use serde::Deserialize;
use tokio::sync::mpsc;

use crate::adapters::http::middleware::{auth_error_response, session_token, AuthState};
use crate::application::handlers::chat::{RelayError, RelayMessageCommand, RelayMessageHandler};
use crate::config::RealtimeConfig;
use crate::domain::chat::RoomId;
use crate::domain::foundation::{AuthError, AuthenticatedUser};

use super::{
    messages::{ClientMessage, ErrorMessage, JoinChat, SendMessage, ServerMessage},
    rooms::{ClientId, RoomManager},
};

/// State required for websocket handling.
#[derive(Clone)]
pub struct WebSocketState {
    pub room_manager: Arc<RoomManager>,
    pub relay: Arc<RelayMessageHandler>,
    pub auth: AuthState,
    pub realtime: RealtimeConfig,
}

impl WebSocketState {
    pub fn new(
        room_manager: Arc<RoomManager>,
        relay: Arc<RelayMessageHandler>,
        auth: AuthState,
        realtime: RealtimeConfig,
    ) -> Self {
        Self {
            room_manager,
            relay,
            auth,
            realtime,
        }
    }
}

/// Browsers cannot set headers on a websocket handshake, so the token may
/// also come in the query string.
#[derive(Debug, Default, Deserialize)]
pub struct ConnectParams {
    #[serde(default)]
    pub token: Option<String>,
}

/// GET /ws - Authenticate, then upgrade to a chat channel.
///
/// Token sources, in order: `Authorization: Bearer`, the session cookie,
/// the `token` query parameter. No socket is created for an unauthenticated
/// request.
pub async fn ws_handler(
    State(state): State<WebSocketState>,
    headers: HeaderMap,
    Query(params): Query<ConnectParams>,
    ws: Result<WebSocketUpgrade, WebSocketUpgradeRejection>,
) -> Response {
    let user = match authenticate(&state.auth, &headers, params).await {
        Ok(user) => user,
        Err(e) => {
            tracing::debug!(error = %e, "Rejected chat channel handshake");
            return auth_error_response(&e);
        }
    };

    match ws {
        Ok(ws) => ws.on_upgrade(move |socket| handle_socket(socket, user, state)),
        Err(rejection) => rejection.into_response(),
    }
}

async fn authenticate(
    auth: &AuthState,
    headers: &HeaderMap,
    params: ConnectParams,
) -> Result<AuthenticatedUser, AuthError> {
    let token = session_token(headers, &auth.session_cookie)
        .or_else(|| params.token.filter(|t| !t.trim().is_empty()))
        .ok_or(AuthError::MissingToken)?;

    auth.validator.validate(&token).await
}

/// Runs for the lifetime of an authenticated connection.
async fn handle_socket(socket: WebSocket, user: AuthenticatedUser, state: WebSocketState) {
    let (mut sink, mut stream) = socket.split();
    let client_id = ClientId::new();
    let (outbound, mut outbound_rx) =
        mpsc::channel::<ServerMessage>(state.realtime.outbound_buffer);

    tracing::info!(client_id = %client_id, user_id = %user.id, "Chat channel opened");

    let mut send_task = {
        let client_id = client_id.clone();
        tokio::spawn(async move {
            while let Some(msg) = outbound_rx.recv().await {
                if let Err(e) = send_message(&mut sink, &msg).await {
                    tracing::debug!(client_id = %client_id, "Send error, closing connection: {}", e);
                    break;
                }
            }
        })
    };

    let mut recv_task = {
        let client_id = client_id.clone();
        let state = state.clone();
        tokio::spawn(async move {
            let channel = Channel {
                client_id,
                user,
                outbound,
                state,
            };
            while let Some(result) = stream.next().await {
                match result {
                    Ok(Message::Text(text)) => channel.on_text(&text).await,
                    Ok(Message::Binary(_)) => {
                        tracing::warn!(client_id = %channel.client_id, "Received unsupported binary message");
                    }
                    Ok(Message::Close(_)) => {
                        tracing::debug!(client_id = %channel.client_id, "Client sent close frame");
                        break;
                    }
                    // Protocol pings are answered by axum
                    Ok(_) => {}
                    Err(e) => {
                        tracing::debug!(client_id = %channel.client_id, "Receive error: {}", e);
                        break;
                    }
                }
            }
        })
    };

    tokio::select! {
        _ = &mut send_task => recv_task.abort(),
        _ = &mut recv_task => send_task.abort(),
    }

    let left = state.room_manager.leave_all(&client_id).await;
    tracing::info!(client_id = %client_id, rooms_left = left, "Chat channel closed");
}

/// One authenticated connection's view of the server.
struct Channel {
    client_id: ClientId,
    user: AuthenticatedUser,
    outbound: mpsc::Sender<ServerMessage>,
    state: WebSocketState,
}

impl Channel {
    async fn on_text(&self, text: &str) {
        match serde_json::from_str::<ClientMessage>(text) {
            Ok(ClientMessage::JoinChat(join)) => self.on_join(join).await,
            Ok(ClientMessage::SendMessage(send)) => self.on_send(send).await,
            Err(e) => {
                tracing::debug!(client_id = %self.client_id, "Ignoring malformed event: {}", e);
                self.report(ErrorMessage::new("BAD_EVENT", "Unrecognized event"));
            }
        }
    }

    async fn on_join(&self, join: JoinChat) {
        let Some(room) = RoomId::from_client(&join.room_id) else {
            tracing::debug!(client_id = %self.client_id, "Ignoring join with empty room id");
            return;
        };

        let joined = self
            .state
            .room_manager
            .join(room.clone(), self.client_id.clone(), self.outbound.clone())
            .await;
        tracing::debug!(client_id = %self.client_id, room = %room, joined, "Join chat");
    }

    async fn on_send(&self, send: SendMessage) {
        let cmd = RelayMessageCommand {
            sender: self.user.id.clone(),
            product_id: send.product_id,
            buyer_id: send.buyer_id,
            content: send.content,
        };

        match self.state.relay.handle(cmd).await {
            Ok(outcome) => {
                tracing::debug!(
                    client_id = %self.client_id,
                    room = %outcome.room,
                    delivered = outcome.delivered,
                    "Message sent"
                );
            }
            Err(RelayError::Store(e)) => {
                tracing::warn!(client_id = %self.client_id, user_id = %self.user.id, "Message not stored: {}", e);
                self.report(ErrorMessage::new(
                    RelayError::Store(e).code(),
                    "Message could not be delivered",
                ));
            }
            Err(e) => {
                tracing::debug!(client_id = %self.client_id, user_id = %self.user.id, "Message dropped: {}", e);
                self.report(ErrorMessage::new(e.code(), e.to_string()));
            }
        }
    }

    /// Sends an error event to this channel only, when enabled.
    fn report(&self, error: ErrorMessage) {
        if !self.state.realtime.error_events {
            return;
        }
        if self.outbound.try_send(ServerMessage::Error(error)).is_err() {
            tracing::debug!(client_id = %self.client_id, "Could not queue error event");
        }
    }
}

/// Send a JSON message over the websocket.
async fn send_message(
    sink: &mut futures::stream::SplitSink<WebSocket, Message>,
    msg: &ServerMessage,
) -> Result<(), axum::Error> {
    match serde_json::to_string(msg) {
        Ok(json) => sink.send(Message::Text(json)).await,
        Err(e) => {
            tracing::error!("Failed to serialize server message: {}", e);
            Ok(())
        }
    }
}

/// Router for the chat channel endpoint.
pub fn websocket_routes(state: WebSocketState) -> axum::Router {
    use axum::routing::get;

    axum::Router::new()
        .route("/ws", get(ws_handler))
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::auth::MockSessionValidator;
    use crate::adapters::memory::{InMemoryCatalog, InMemoryConversationStore};
    use axum::body::Body;
    use axum::http::{header, Request, StatusCode};
    use tower::ServiceExt;

    fn state(error_events: bool) -> WebSocketState {
        let rooms = Arc::new(RoomManager::new());
        let catalog = Arc::new(InMemoryCatalog::new());
        let relay = Arc::new(RelayMessageHandler::new(
            catalog,
            Arc::new(InMemoryConversationStore::new()),
            rooms.clone(),
        ));
        let validator = Arc::new(MockSessionValidator::new().with_test_user("good", "buyer-1"));
        WebSocketState::new(
            rooms,
            relay,
            AuthState::new(validator, "session"),
            RealtimeConfig {
                outbound_buffer: 8,
                error_events,
            },
        )
    }

    async fn handshake(uri: &str, headers: &[(header::HeaderName, &str)]) -> StatusCode {
        let mut request = Request::builder().uri(uri);
        for (name, value) in headers {
            request = request.header(name.clone(), *value);
        }
        websocket_routes(state(false))
            .oneshot(request.body(Body::empty()).unwrap())
            .await
            .unwrap()
            .status()
    }

    #[tokio::test]
    async fn handshake_without_token_is_unauthorized() {
        assert_eq!(handshake("/ws", &[]).await, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn handshake_with_invalid_token_is_unauthorized() {
        assert_eq!(
            handshake("/ws?token=forged", &[]).await,
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            handshake("/ws", &[(header::AUTHORIZATION, "Bearer forged")]).await,
            StatusCode::UNAUTHORIZED
        );
    }

    #[tokio::test]
    async fn authenticated_non_upgrade_request_passes_the_gate() {
        // Authentication succeeds; only the missing upgrade headers fail.
        for status in [
            handshake("/ws?token=good", &[]).await,
            handshake("/ws", &[(header::COOKIE, "session=good")]).await,
        ] {
            assert_ne!(status, StatusCode::UNAUTHORIZED);
            assert!(status.is_client_error());
        }
    }

    #[tokio::test]
    async fn query_token_is_used_when_headers_are_absent() {
        let state = state(false);
        let user = authenticate(
            &state.auth,
            &HeaderMap::new(),
            ConnectParams {
                token: Some("good".into()),
            },
        )
        .await
        .unwrap();
        assert_eq!(user.id.as_str(), "buyer-1");
    }

    fn channel(error_events: bool) -> (Channel, mpsc::Receiver<ServerMessage>) {
        let (outbound, rx) = mpsc::channel(8);
        let user = AuthenticatedUser::new(
            crate::domain::foundation::UserId::new("buyer-1").unwrap(),
            "b@example.com",
            None,
        );
        (
            Channel {
                client_id: ClientId::new(),
                user,
                outbound,
                state: state(error_events),
            },
            rx,
        )
    }

    #[tokio::test]
    async fn join_event_registers_channel_in_room() {
        let (channel, _rx) = channel(false);
        channel
            .on_text(r#"{"event":"join-chat","data":{"roomId":"P1B1"}}"#)
            .await;

        let room = RoomId::from_client("p1b1").unwrap();
        assert_eq!(channel.state.room_manager.client_count(&room).await, 1);
    }

    #[tokio::test]
    async fn rejected_send_is_silent_by_default() {
        let (channel, mut rx) = channel(false);
        channel
            .on_text(r#"{"event":"send-message","data":{"productId":"nope","content":"hi"}}"#)
            .await;
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn rejected_send_reports_error_when_enabled() {
        let (channel, mut rx) = channel(true);
        channel
            .on_text(r#"{"event":"send-message","data":{"productId":"nope","content":"hi"}}"#)
            .await;

        match rx.try_recv().unwrap() {
            ServerMessage::Error(e) => assert_eq!(e.code, "INVALID_PRODUCT"),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[tokio::test]
    async fn malformed_event_reports_error_when_enabled() {
        let (channel, mut rx) = channel(true);
        channel.on_text("not json").await;
        assert!(matches!(rx.try_recv().unwrap(), ServerMessage::Error(_)));
    }
}
