use parking_lot::Mutex;
use tokio::sync::mpsc;

use crate::{
    events::timestamp_now, util::Id, CollabContext, PrimaryKey, RoomEvent, UserData,
};

use super::RoomHandle;

pub type RoomConnectionId = Id<RoomConnection>;

/// A realtime broadcast group scoped to one board's connected members
pub struct Room {
    board_id: PrimaryKey,
    connections: Mutex<Vec<RoomConnection>>,
}

/// A user's presence in a room. The same user can be connected more than
/// once, from different devices.
pub struct RoomConnection {
    pub id: RoomConnectionId,
    pub user: UserData,
    sender: mpsc::UnboundedSender<RoomEvent>,
}

impl Room {
    pub fn new(board_id: PrimaryKey) -> Self {
        Self {
            board_id,
            connections: Default::default(),
        }
    }

    pub fn board_id(&self) -> PrimaryKey {
        self.board_id
    }

    /// Registers a new connection, notifying the users already present
    pub(crate) fn connect(&self, context: &CollabContext, user: UserData) -> RoomHandle {
        let (sender, receiver) = mpsc::unbounded_channel();

        let connection = RoomConnection {
            id: RoomConnectionId::new(),
            user: user.clone(),
            sender,
        };

        let connection_id = connection.id;

        // Existing occupants hear about the newcomer, the newcomer doesn't
        self.broadcast(RoomEvent::UserJoined {
            board_id: self.board_id,
            username: user.username.clone(),
            timestamp: timestamp_now(),
        });

        self.connections.lock().push(connection);

        RoomHandle::new(context, self.board_id, connection_id, user, receiver)
    }

    /// Delivers the event to every connection currently in the room.
    /// Delivery is fire-and-forget, a closed receiver is skipped.
    pub fn broadcast(&self, event: RoomEvent) {
        for connection in self.connections.lock().iter() {
            let _ = connection.sender.send(event.clone());
        }
    }

    /// Like [Self::broadcast], but skips one connection
    pub fn broadcast_except(&self, excluded: RoomConnectionId, event: RoomEvent) {
        for connection in self.connections.lock().iter() {
            if connection.id != excluded {
                let _ = connection.sender.send(event.clone());
            }
        }
    }

    /// Removes a connection, returning its user if it was present
    pub(crate) fn remove_connection(&self, connection_id: RoomConnectionId) -> Option<UserData> {
        let mut connections = self.connections.lock();

        let user = connections
            .iter()
            .find(|c| c.id == connection_id)
            .map(|c| c.user.clone());

        connections.retain(|c| c.id != connection_id);

        user
    }

    pub fn is_empty(&self) -> bool {
        self.connections.lock().is_empty()
    }

    /// The users currently connected. The same user can appear twice.
    pub fn occupants(&self) -> Vec<UserData> {
        self.connections.lock().iter().map(|c| c.user.clone()).collect()
    }
}
