//! Websocket adapters for live chat.
//!
//! ```text
//! client ──join-chat──▶ Channel ──join──▶ RoomManager
//! client ──send-message──▶ Channel ──▶ RelayMessageHandler
//!                                         │ append (ConversationStore)
//!                                         ▼ broadcast (ChatBroadcaster)
//!                                      RoomManager ──new-message──▶ every channel in the room
//! ```
//!
//! # Components
//!
//! - [`messages`] - Channel protocol types
//! - [`rooms`] - Room membership and fan-out
//! - [`handler`] - Authenticated upgrade and per-connection loop

pub mod handler;
pub mod messages;
pub mod rooms;

pub use handler::{websocket_routes, ws_handler, ConnectParams, WebSocketState};
pub use messages::{ClientMessage, ErrorMessage, JoinChat, NewMessage, SendMessage, ServerMessage};
pub use rooms::{ClientId, RoomManager};
