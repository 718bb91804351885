//! End-to-end chat flow without a live socket.
//!
//! A buyer opens the conversation over REST, channels join the conversation
//! room, and messages relayed through the room manager reach the joined
//! channels and show up, in order, in the history REST returns afterwards.

use std::sync::Arc;

use axum::{
    body::{to_bytes, Body},
    http::{header, Request, StatusCode},
    Router,
};
use serde_json::Value;
use tokio::sync::mpsc;
use tower::ServiceExt;

use marketchat::adapters::websocket::{ClientId, ServerMessage};
use marketchat::adapters::{
    build_router, AppServices, InMemoryCatalog, InMemoryConversationStore, MockSessionValidator,
    RoomManager,
};
use marketchat::application::{RelayError, RelayMessageCommand, RelayMessageHandler};
use marketchat::config::AppConfig;
use marketchat::domain::chat::RoomId;
use marketchat::domain::foundation::{ProductId, UserId};
use marketchat::domain::marketplace::{Product, UserProfile};

struct Scenario {
    router: Router,
    rooms: Arc<RoomManager>,
    relay: RelayMessageHandler,
    product_id: ProductId,
    buyer: UserId,
    seller: UserId,
}

fn scenario() -> Scenario {
    let buyer = UserId::new("buyer-1").unwrap();
    let seller = UserId::new("seller-1").unwrap();
    let product_id = ProductId::new();

    let catalog = Arc::new(
        InMemoryCatalog::new()
            .with_product(Product::new(product_id, seller.clone(), "Camera"))
            .with_user(UserProfile::new(seller.clone(), "Sam", "sam@example.com"))
            .with_user(UserProfile::new(buyer.clone(), "Bea", "bea@example.com")),
    );
    let store = Arc::new(InMemoryConversationStore::new());
    let rooms = Arc::new(RoomManager::new());
    let sessions = MockSessionValidator::new()
        .with_test_user("buyer-token", "buyer-1")
        .with_test_user("seller-token", "seller-1");

    let relay = RelayMessageHandler::new(catalog.clone(), store.clone(), rooms.clone());
    let router = build_router(
        AppServices {
            products: catalog.clone(),
            users: catalog,
            store,
            sessions: Arc::new(sessions),
            rooms: rooms.clone(),
        },
        &AppConfig::default(),
    );

    Scenario {
        router,
        rooms,
        relay,
        product_id,
        buyer,
        seller,
    }
}

async fn fetch_chat(s: &Scenario, token: &str, query: &str) -> Value {
    let request = Request::builder()
        .uri(format!("/api/chats/{}{}", s.product_id, query))
        .header(header::AUTHORIZATION, format!("Bearer {token}"))
        .body(Body::empty())
        .unwrap();
    let response = s.router.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

async fn join(s: &Scenario, room: RoomId) -> mpsc::Receiver<ServerMessage> {
    let (tx, rx) = mpsc::channel(16);
    assert!(s.rooms.join(room, ClientId::new(), tx).await);
    rx
}

fn from_buyer(s: &Scenario, content: &str) -> RelayMessageCommand {
    RelayMessageCommand {
        sender: s.buyer.clone(),
        product_id: s.product_id.to_string(),
        buyer_id: None,
        content: content.to_string(),
    }
}

fn from_seller(s: &Scenario, content: &str) -> RelayMessageCommand {
    RelayMessageCommand {
        sender: s.seller.clone(),
        product_id: s.product_id.to_string(),
        buyer_id: Some(s.buyer.to_string()),
        content: content.to_string(),
    }
}

fn content_of(message: ServerMessage) -> String {
    match message {
        ServerMessage::NewMessage(m) => m.content,
        other => panic!("unexpected event: {other:?}"),
    }
}

#[tokio::test]
async fn buyer_and_seller_exchange_messages_in_one_room() {
    let s = scenario();
    let room = RoomId::for_conversation(&s.product_id, &s.buyer);

    fetch_chat(&s, "buyer-token", "").await;
    let mut seller_rx = join(&s, room.clone()).await;
    let mut buyer_rx = join(&s, room.clone()).await;

    let outcome = s.relay.handle(from_buyer(&s, "Is it available?")).await.unwrap();
    assert_eq!(outcome.room, room);
    assert_eq!(outcome.delivered, 2);

    s.relay.handle(from_seller(&s, "Yes, still here")).await.unwrap();

    assert_eq!(content_of(seller_rx.recv().await.unwrap()), "Is it available?");
    assert_eq!(content_of(seller_rx.recv().await.unwrap()), "Yes, still here");
    assert_eq!(content_of(buyer_rx.recv().await.unwrap()), "Is it available?");
    assert_eq!(content_of(buyer_rx.recv().await.unwrap()), "Yes, still here");

    let history = fetch_chat(&s, "seller-token", "?buyerId=buyer-1").await;
    let contents: Vec<_> = history["chat"]["messages"]
        .as_array()
        .unwrap()
        .iter()
        .map(|m| m["content"].as_str().unwrap().to_string())
        .collect();
    assert_eq!(contents, vec!["Is it available?", "Yes, still here"]);
    assert_eq!(history["chat"]["messages"][0]["senderId"], "buyer-1");
}

#[tokio::test]
async fn channels_in_other_rooms_see_nothing() {
    let s = scenario();
    fetch_chat(&s, "buyer-token", "").await;

    let other_room = RoomId::for_conversation(&s.product_id, &UserId::new("buyer-2").unwrap());
    let mut outsider_rx = join(&s, other_room).await;

    let outcome = s.relay.handle(from_buyer(&s, "hi")).await.unwrap();
    assert_eq!(outcome.delivered, 0);
    assert!(outsider_rx.try_recv().is_err());
}

#[tokio::test]
async fn message_is_stored_even_when_nobody_is_listening() {
    let s = scenario();
    fetch_chat(&s, "buyer-token", "").await;

    let outcome = s.relay.handle(from_buyer(&s, "hello?")).await.unwrap();
    assert_eq!(outcome.delivered, 0);

    let history = fetch_chat(&s, "buyer-token", "").await;
    assert_eq!(history["chat"]["messages"][0]["content"], "hello?");
}

#[tokio::test]
async fn message_before_rest_fetch_is_dropped() {
    let s = scenario();
    let mut rx = join(&s, RoomId::for_conversation(&s.product_id, &s.buyer)).await;

    let err = s.relay.handle(from_buyer(&s, "hi")).await.unwrap_err();
    assert!(matches!(err, RelayError::NoConversation));
    assert!(rx.try_recv().is_err());
}

#[tokio::test]
async fn closed_channels_are_left_behind() {
    let s = scenario();
    fetch_chat(&s, "buyer-token", "").await;
    let room = RoomId::for_conversation(&s.product_id, &s.buyer);

    let closed_rx = join(&s, room.clone()).await;
    drop(closed_rx);
    let mut open_rx = join(&s, room).await;

    let outcome = s.relay.handle(from_buyer(&s, "hi")).await.unwrap();
    assert_eq!(outcome.delivered, 1);
    assert_eq!(content_of(open_rx.recv().await.unwrap()), "hi");
}
