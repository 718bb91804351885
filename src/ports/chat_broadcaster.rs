//! Fan-out port for live chat delivery.

use async_trait::async_trait;

use crate::domain::chat::{Message, RoomId};

/// Delivers a stored message to every channel currently joined to a room.
///
/// Delivery is best-effort and at-most-once: channels that are gone or
/// backed up simply miss the message.
#[async_trait]
pub trait ChatBroadcaster: Send + Sync {
    /// Returns how many channels the message was handed to.
    async fn broadcast(&self, room: &RoomId, message: &Message) -> usize;
}
