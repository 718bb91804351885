//! Room registry for live chat fan-out.
//!
//! A room is the set of channels currently watching one conversation. A
//! channel can be in several rooms at once (a seller answering several
//! buyers), and leaves all of them when it disconnects.
//!
//! ```text
//! Room: {product}{buyer-a}    Room: {product}{buyer-b}
//! ├── client-1 (buyer a)      ├── client-3 (buyer b)
//! └── client-2 (seller)       └── client-2 (seller)
//! ```

use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use tokio::sync::{mpsc, RwLock};
use uuid::Uuid;

use crate::domain::chat::{Message, RoomId};
use crate::ports::ChatBroadcaster;

use super::messages::ServerMessage;

/// Unique identifier for a websocket connection, generated server-side.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ClientId(Uuid);

impl ClientId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ClientId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ClientId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

type Outbound = mpsc::Sender<ServerMessage>;

#[derive(Default)]
struct Registry {
    rooms: HashMap<RoomId, HashMap<ClientId, Outbound>>,
    /// Reverse index for disconnect cleanup.
    memberships: HashMap<ClientId, HashSet<RoomId>>,
}

/// Process-local registry of room membership.
///
/// Each channel is represented by the sending half of its outbound queue.
/// Broadcasts never wait on a slow channel: a full queue drops the message
/// for that channel only.
#[derive(Default)]
pub struct RoomManager {
    registry: RwLock<Registry>,
}

impl RoomManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a channel to a room, creating the room if needed.
    ///
    /// Returns `false` if the channel was already a member.
    pub async fn join(&self, room: RoomId, client_id: ClientId, outbound: Outbound) -> bool {
        let mut registry = self.registry.write().await;

        let members = registry.rooms.entry(room.clone()).or_default();
        if members.contains_key(&client_id) {
            return false;
        }
        members.insert(client_id.clone(), outbound);

        registry.memberships.entry(client_id).or_default().insert(room);
        true
    }

    /// Removes a channel from every room it joined. Empty rooms are dropped.
    ///
    /// Returns the number of rooms left.
    pub async fn leave_all(&self, client_id: &ClientId) -> usize {
        let mut registry = self.registry.write().await;

        let Some(rooms) = registry.memberships.remove(client_id) else {
            return 0;
        };

        for room in &rooms {
            if let Some(members) = registry.rooms.get_mut(room) {
                members.remove(client_id);
                if members.is_empty() {
                    registry.rooms.remove(room);
                }
            }
        }
        rooms.len()
    }

    /// Hands `message` to every channel in `room`. Returns how many accepted it.
    pub async fn send_to_room(&self, room: &RoomId, message: &ServerMessage) -> usize {
        let registry = self.registry.read().await;

        let Some(members) = registry.rooms.get(room) else {
            return 0;
        };

        let mut delivered = 0;
        for (client_id, outbound) in members {
            match outbound.try_send(message.clone()) {
                Ok(()) => delivered += 1,
                Err(mpsc::error::TrySendError::Full(_)) => {
                    tracing::warn!(client_id = %client_id, room = %room, "Outbound queue full, dropping message");
                }
                Err(mpsc::error::TrySendError::Closed(_)) => {
                    tracing::debug!(client_id = %client_id, room = %room, "Channel already closed");
                }
            }
        }
        delivered
    }

    /// Number of channels in a room (0 if the room does not exist).
    pub async fn client_count(&self, room: &RoomId) -> usize {
        self.registry
            .read()
            .await
            .rooms
            .get(room)
            .map(HashMap::len)
            .unwrap_or(0)
    }

    #[cfg(test)]
    pub async fn active_rooms(&self) -> Vec<RoomId> {
        self.registry.read().await.rooms.keys().cloned().collect()
    }

    /// Rooms a channel is currently in.
    #[cfg(test)]
    pub async fn rooms_of(&self, client_id: &ClientId) -> Vec<RoomId> {
        self.registry
            .read()
            .await
            .memberships
            .get(client_id)
            .map(|rooms| rooms.iter().cloned().collect())
            .unwrap_or_default()
    }
}

#[async_trait]
impl ChatBroadcaster for RoomManager {
    async fn broadcast(&self, room: &RoomId, message: &Message) -> usize {
        self.send_to_room(room, &ServerMessage::NewMessage(message.into()))
            .await
    }
}
