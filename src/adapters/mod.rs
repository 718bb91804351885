//! Adapters - Implementations of port interfaces.
//!
//! Adapters connect the domain to external systems:
//! - `postgres` - Conversation store and catalog on PostgreSQL
//! - `memory` - In-process store and catalog for tests and local runs
//! - `auth` - Session token validation (HS256 JWT, mock)
//! - `http` - REST routes, middleware and the application router
//! - `websocket` - Chat channels and room fan-out

pub mod auth;
pub mod http;
pub mod memory;
pub mod postgres;
pub mod websocket;

pub use auth::{JwtSessionValidator, MockSessionValidator};
pub use http::{build_router, AppServices};
pub use memory::{InMemoryCatalog, InMemoryConversationStore};
pub use postgres::{PostgresCatalog, PostgresConversationStore};
pub use websocket::RoomManager;
