mod connection;
mod room;

pub use connection::*;
pub use room::*;

use std::sync::Arc;

use log::info;
use thiserror::Error;

use crate::{CollabContext, DatabaseError, Membership, PrimaryKey, RoomEvent, UserData};

#[derive(Debug, Error)]
pub enum RoomError {
    /// The membership check at join time failed
    #[error("User is not a member of this board")]
    JoinDenied,
    #[error(transparent)]
    Db(#[from] DatabaseError),
}

/// Maps realtime connections to board rooms and fans events out to them.
///
/// The room registry lives on the [CollabContext] and is only touched
/// through this manager and the handles it returns. Membership is
/// re-validated against the live board state on every join. Once a
/// connection is in a room it stays trusted for its lifetime, revoking a
/// membership does not evict already-joined connections.
pub struct RoomManager {
    context: CollabContext,
    membership: Membership,
}

impl RoomManager {
    pub fn new(context: &CollabContext) -> Self {
        Self {
            context: context.clone(),
            membership: Membership::new(context),
        }
    }

    /// Joins the board's room after re-validating membership. The caller
    /// gets a handle yielding the room's events, everyone already present
    /// is notified.
    pub async fn join(
        &self,
        board_id: PrimaryKey,
        user: &UserData,
    ) -> Result<RoomHandle, RoomError> {
        let is_member = self.membership.is_member(board_id, user.id).await?;

        if !is_member {
            return Err(RoomError::JoinDenied);
        }

        let room = self
            .context
            .rooms
            .entry(board_id)
            .or_insert_with(|| Arc::new(Room::new(board_id)))
            .clone();

        let handle = room.connect(&self.context, user.clone());

        info!("{} joined the room for board {}", user.username, board_id);

        Ok(handle)
    }

    /// Delivers an event to everyone in the board's room, if it has one
    pub fn broadcast(&self, board_id: PrimaryKey, event: RoomEvent) {
        self.context.broadcast(board_id, event)
    }

    /// The users currently connected to the board's room
    pub fn occupants(&self, board_id: PrimaryKey) -> Vec<UserData> {
        self.context
            .rooms
            .get(&board_id)
            .map(|room| room.occupants())
            .unwrap_or_default()
    }
}
